pub mod connection;
pub mod consistency;
pub mod migrator;
pub mod settings;
pub mod sources;
pub mod validation;

pub use connection::*;
pub use consistency::*;
pub use migrator::*;
pub use settings::*;
pub use sources::*;
pub use validation::*;
