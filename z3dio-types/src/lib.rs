pub mod anomaly;
pub mod error;
pub mod fields;
pub mod profile;
pub mod stamp;

pub use anomaly::*;
pub use error::*;
pub use fields::*;
pub use profile::*;
pub use stamp::*;
