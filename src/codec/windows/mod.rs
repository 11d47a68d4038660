//! Windows cursor formats: RIFF-wrapped `.ani` animations and ICO-family
//! `.cur` static cursors.

pub mod ani;
pub mod cur;
pub mod riff;
