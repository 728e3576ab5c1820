// Session commands

pub mod login;
pub mod whoami;
pub mod logout;
pub mod portal_credentials;
