pub mod db;
pub mod discover;
pub mod fetch;
pub mod output;
pub mod schedule;
pub mod settings;
pub mod venue;
