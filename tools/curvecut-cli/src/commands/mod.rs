pub mod check;
pub mod curve;
pub mod finalize;
pub mod init;
pub mod inspect;
pub mod synth;
