pub mod permit;
pub mod principal;
pub mod traits;
pub mod user;

pub use self::principal::Principal;
pub use self::user::User;
