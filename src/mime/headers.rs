/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::fmt::Display;

use super::{HeaderMap, MIME_VERSION};

impl<'x> HeaderMap<'x> {
    /// Writes every set header as a `Name: Value\r\n` line.
    pub fn write_to(&self, out: &mut String) {
        for (name, value) in self.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
    }

    /// Renders the top-level header block of a message.
    ///
    /// `MIME-Version: 1.0` is appended unless the caller provided one.
    pub fn render_message_headers(&self) -> String {
        let mut out = String::with_capacity(self.len() * 40);
        self.write_to(&mut out);
        if !self.contains(MIME_VERSION) {
            out.push_str(MIME_VERSION);
            out.push_str(": 1.0\r\n");
        }
        out
    }
}

impl<'x> Display for HeaderMap<'x> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in self.iter() {
            f.write_str(name)?;
            f.write_str(": ")?;
            f.write_str(value)?;
            f.write_str("\r\n")?;
        }
        Ok(())
    }
}
