pub mod cost;
pub mod health;
pub mod history;
pub mod patients;
pub mod queries;
pub mod stream;
