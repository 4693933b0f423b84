pub mod data;
pub mod disk;
pub mod evaluate;
pub mod mail;
pub mod notify;
pub mod render;
pub mod run;
pub mod sms;
pub mod units;
