//! Wire Format
//!
//! This module documents the text format produced by [`Serializer`](crate::Serializer)
//! and read by [`Deserializer`](crate::Deserializer).
//!
//! # Overview
//!
//! A document is one line of text with four parts, in order:
//!
//! ```text
//! <flags> [<len>]<type table> [<len>]<reference blocks> <main body>
//! ```
//!
//! The table and the block region are present only when their flag is set.
//! Every length counts characters, not bytes.
//!
//! ## Design Philosophy
//!
//! - **Identity survives**: an object reached twice is written once and
//!   referenced by id everywhere else, so cycles terminate and aliases decode
//!   as one instance
//! - **No escaping**: strings carry their length and are skipped whole, so
//!   their content may contain any structural character
//! - **Compact types**: full type names appear once, in the table
//!
//! # Header
//!
//! Two flag characters:
//!
//! | Position | Set | Clear | Meaning |
//! |----------|-----|-------|---------|
//! | 1 | `r` | `-` | a reference block region follows |
//! | 2 | `t` | `-` | a type table follows |
//!
//! The type table is the `&`-joined list of full type names, prefixed by its
//! length. A type token `(n)` in a body is an index into this list. With the
//! table disabled, tokens carry the literal name instead: `(i32)7`.
//!
//! ```text
//! -t[14]demo.Point&i32(0)<[x]=(1)3><[y]=(1)0>
//! ```
//!
//! # Bodies
//!
//! | Value | Form | Example |
//! |-------|------|---------|
//! | Null | nothing | `<[next]=>` |
//! | String | `~[len]chars` | `~[5]a>b<c` |
//! | Scalar | `(type)text` | `(2)42` |
//! | Enum | `(type)variant` | `(3)Red` |
//! | Object | `(type)` then one segment per member | `(0)<[x]=(1)3>` |
//! | Sequence | `(type)` then one segment per element, keyed by index | `(4)<[0]=(1)1><[1]=(1)2>` |
//! | Dictionary | like a sequence, each payload is `key|value` | `(5)<[0]=~[1]a|(1)1>` |
//! | Reference | `(type)ref<id>` | `(0)ref2` |
//!
//! A segment is `<[key]=payload>`. Segments nest, and a string token is never
//! scanned, so `>` or `|` inside a string does not end anything.
//!
//! ## Scalar text
//!
//! - `bool`: `true` or `false`
//! - integers: decimal
//! - `f32`, `f64`: shortest round-trip decimal, plus `NaN`, `inf`, `-inf`
//! - `decimal`: `-?digits[.digits]`, scale preserved
//! - `datetime`: RFC 3339 in UTC, e.g. `2024-01-15T10:30:00Z`; years outside
//!   0000 to 9999 carry a sign, e.g. `+10000-01-01T00:00:00Z`
//! - `duration`: `seconds:nanoseconds`, both signed
//! - `guid`: hyphenated lowercase hex
//!
//! # Reference Blocks
//!
//! The region is a run of `{len&id&body}` entries. Each holds the full body of
//! one object that was referenced somewhere by `ref<id>`. The root is id 0
//! and is never put in a block; its body is always the main body.
//!
//! Blocks are emitted last-discovered first. A decoder allocates every block
//! before filling any, so the order carries no meaning for correctness.
//!
//! ```text
//! rt[9]demo.Node[22]{15&1&(0)<[a]=><[b]=>}(0)<[a]=(0)ref1><[b]=(0)ref1>
//! ```
//!
//! # Aliasing Modes
//!
//! With aliases preserved, every object reached more than once is referenced.
//! In copy mode only objects that close a cycle are; other shared objects are
//! written again at each occurrence and decode as independent copies. A cycle
//! back to the root yields one duplicate of the root, which keeps the cycle.
//!
//! # Limitations
//!
//! - **Member order**: declaration order of the schema on both sides
//! - **Type names**: `[A-Za-z_][A-Za-z0-9_.:]*`, not a reserved shape keyword
//! - **Polymorphism**: a slot holds exactly its declared shape, except `any`
//! - **Errors**: fatal; a malformed document never yields a partial graph
//! - **Depth**: encoding and decoding recurse per nested inline body, so
//!   very long chains need a thread with a larger stack

// This module contains only documentation; no implementation code
