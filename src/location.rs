//! Source location for different IR entities

use std::{fmt::Debug, path::PathBuf};

use crate::{
    context::Context,
    printable::{self, Printable},
    uniqued_any::{self, UniquedKey},
};

/// Where is the source program?
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum Source {
    /// Program being read from a file.
    File(UniquedKey<PathBuf>),
    /// Program is in memory.
    InMemory,
}

impl Source {
    /// A [Source] for a file path. The path itself is stored uniquely,
    /// once per [Context], no matter how many locations refer to it.
    pub fn new_from_file(ctx: &mut Context, path: PathBuf) -> Source {
        Source::File(uniqued_any::save(ctx, path))
    }
}

impl Printable for Source {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Source::File(path_key) => {
                write!(f, "{}", path_key.get().display())
            }
            Source::InMemory => write!(f, "<in-memory>"),
        }
    }
}

/// A line / column pair within a [Source].
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub fn new(line: u32, column: u32) -> LineCol {
        LineCol { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

/// Represents a (combination of) program source locations.
/// This captures a subset of MLIR's
/// [BuiltinLocationAttributes](https://mlir.llvm.org/docs/Dialects/Builtin/#location-attributes).
/// For simplicity, [Location] is not extensible.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Location {
    /// A [Source] along with a [position](LineCol) within it.
    /// Same as MLIR's [FileLineColLoc](https://mlir.llvm.org/docs/Dialects/Builtin/#filelinecolloc).
    SrcPos { src: Source, pos: LineCol },
    /// Location with a name.
    /// See [NameLoc](https://mlir.llvm.org/docs/Dialects/Builtin/#nameloc).
    Named {
        name: String,
        child_loc: Box<Location>,
    },
    /// Connects the location of a callee with the location of the caller.
    /// See [CallSiteLoc](https://mlir.llvm.org/docs/Dialects/Builtin/#callsiteloc).
    CallSite {
        callee: Box<Location>,
        caller: Box<Location>,
    },
    /// Location unknown.
    /// See [UnknownLoc](https://mlir.llvm.org/docs/Dialects/Builtin/#unknownloc).
    Unknown,
}

impl Location {
    /// If the location is from exactly one source, get that source.
    pub fn source(&self) -> Option<Source> {
        let sources = self.sources();
        if sources.len() == 1 {
            sources.first().cloned()
        } else {
            None
        }
    }

    /// Get all sources that this location is associated with.
    pub fn sources(&self) -> Vec<Source> {
        let mut res = Vec::new();
        fn sources(loc: &Location, res: &mut Vec<Source>) {
            match loc {
                Location::SrcPos { src, pos: _ } => {
                    if !res.contains(src) {
                        res.push(src.clone());
                    }
                }
                Location::Named { name: _, child_loc } => {
                    sources(child_loc, res);
                }
                Location::CallSite { callee, caller } => {
                    sources(callee, res);
                    sources(caller, res);
                }
                Location::Unknown => (),
            }
        }
        sources(self, &mut res);
        res
    }
}

impl Printable for Location {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &printable::State,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::SrcPos { src, pos } => {
                write!(f, "{}: {}", src.disp(ctx), pos)
            }
            Self::Named { name, child_loc } => {
                write!(f, "{}({})", name, child_loc.disp(ctx))
            }
            Self::CallSite { callee, caller } => {
                write!(f, "callsite({} at {})", callee.disp(ctx), caller.disp(ctx))
            }
            Self::Unknown => write!(f, "?"),
        }
    }
}

/// Any object that has an associated location.
pub trait Located {
    fn loc(&self) -> Location;
    fn set_loc(&mut self, loc: Location);
}
