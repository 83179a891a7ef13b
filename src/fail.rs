// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use custom_error::custom_error;
use std::io::Error as IoError;

type Str = &'static str;

custom_error! {#[derive(Clone)] pub Fail
    ConfigError{details: Str} = "invalid configuration ({details})",
    IoError{} = "IO error",
    FileNotFound{path: String} = "requested file not found ({path})",
    MalformedPacket{details: Str} = "encountered a malformed datagram ({details})",
    Ignored{details: Str} = "operation had no effect ({details})",
}

impl From<IoError> for Fail {
    fn from(_: IoError) -> Self {
        Fail::IoError {}
    }
}
