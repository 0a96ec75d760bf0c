#![allow(dead_code)]

pub mod sink;

pub fn install_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
