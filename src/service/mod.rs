pub mod meetings;
