// Managers Module
//
// Each manager handles one specific concern:
// - ConnectionManager: transport ownership, bounded connect jobs, link supervision
// - CalibrationManager: calibration claim, progress snapshot and active profile
// - SessionManager: recording session access and the save flow

pub mod calibration_manager;
pub mod connection_manager;
pub mod session_manager;

pub use calibration_manager::CalibrationManager;
pub use connection_manager::{
    ConnectOutcome, ConnectRequest, ConnectionManager, ConnectionState, ConnectionStatus,
};
pub use session_manager::{SealedSession, SessionManager};
