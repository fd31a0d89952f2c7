pub mod config;
pub mod db;
pub mod etl;
pub mod logging;
