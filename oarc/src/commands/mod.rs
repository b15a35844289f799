mod append;
mod cat;
mod create;
mod extract;
mod formats;
mod identify;
mod list;

pub use append::run as append;
pub use cat::run as cat;
pub use create::run as create;
pub use extract::run as extract;
pub use formats::run as formats;
pub use identify::run as identify;
pub use list::run as list;
