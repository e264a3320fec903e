//! Console API served to the browser.

pub mod http;
