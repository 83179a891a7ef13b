// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Sender side of a selective-repeat reliable file-transfer protocol
//! layered on UDP. See the module list below for the component breakdown:
//! wire codec, file I/O, fault injection, timer queue, window, congestion
//! control, and the top-level transfer engine that ties them together.

pub mod config;
pub mod congestion;
pub mod engine;
pub mod fail;
pub mod fault;
pub mod file_source;
pub mod packet;
pub mod timer_queue;
pub mod transfer;
pub mod transport;
pub mod window;

pub use config::Config;
pub use engine::Engine;
pub use fail::Fail;
