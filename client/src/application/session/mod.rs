// Session bootstrap and portal login management (never captcha-gated)

pub mod commands;
