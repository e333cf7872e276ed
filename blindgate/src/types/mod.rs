mod change_gate;
mod position;

pub use change_gate::ChangeGate;
pub use position::{Direction, Position};
