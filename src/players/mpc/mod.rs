// MPC-HC web interface support
pub mod variables;
pub mod mpchc;

pub use mpchc::MpcProtocol;
