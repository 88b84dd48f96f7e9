// This file makes the screen modules available to the rest of the application.

pub mod my_code;
pub mod reset_password;
pub mod scan;
