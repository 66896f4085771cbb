pub mod client_ip;
pub mod deadline;
pub mod lenient;
pub mod pattern;
pub mod slug;
