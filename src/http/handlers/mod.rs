mod health;
mod signup;

pub use health::health;
pub use signup::{artist_signup, investor_investment, listener_signup, subscribe};
