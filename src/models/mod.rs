pub mod appointment;
pub mod consultation;
pub mod conversation;
pub mod enums;
pub mod symptom;

pub use appointment::*;
pub use consultation::*;
pub use conversation::*;
pub use enums::*;
pub use symptom::*;
