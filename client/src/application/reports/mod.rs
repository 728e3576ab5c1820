// Back-office reports for a filing period; gated calls go through the
// guarded client so a captcha can interrupt any of them

pub mod commands;
