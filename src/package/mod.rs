mod descriptor;
mod name;
pub mod validate;

pub use descriptor::{Author, Dist, PackageDescriptor};
pub use name::{InvalidName, PackageName};
pub use validate::{AddonType, Rejection, is_installable, rejection_reason};
