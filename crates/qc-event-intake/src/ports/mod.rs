//! # Ports Layer
//!
//! - `inbound`: the API the rest of the node drives
//! - `outbound`: collaborators the intake pipeline depends on

pub mod inbound;
pub mod outbound;
