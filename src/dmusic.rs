// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::error::Error;

pub mod inventory;
pub mod session;
pub mod stack;

#[cfg(windows)]
mod com;
#[cfg(test)]
pub mod mock;

use inventory::Inventory;

pub use session::{Options, Session};
pub use stack::Stack;

/// Gets the operating system's music and sound stack.
pub fn get_stack() -> Result<Box<dyn Stack>, Error> {
    #[cfg(windows)]
    {
        Ok(Box::new(com::Stack::new()))
    }
    #[cfg(not(windows))]
    {
        Err(Error::UnsupportedPlatform { backend: "DS" })
    }
}

/// Enumerates both device inventories through a short-lived session,
/// tearing everything down again before returning.
pub fn list(mut stack: Box<dyn Stack>) -> Result<Inventory, Error> {
    let result = scan(stack.as_mut());
    session::run_teardown(stack.as_mut());
    result
}

fn scan(stack: &mut dyn Stack) -> Result<Inventory, Error> {
    stack.init_com()?;
    stack.create_objects()?;
    Inventory::scan(stack)
}
