pub mod contacts;
pub mod messages;
pub mod response;
pub mod routes;
