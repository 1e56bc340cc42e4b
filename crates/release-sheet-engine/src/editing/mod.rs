/*!
 * # Editing Core
 *
 * In-memory editing state for one open release sheet.
 *
 * ## Architecture Overview
 *
 * ### 1. Block tree as the live model
 * - The editor holds a `DocTree`: ordered blocks with stable ids
 * - Persisted content is parsed into the tree on open and on every remote
 *   apply, and serialized back block by block on save
 *
 * ### 2. Command-Based Editing
 * - All local edits are `Cmd` values applied through `EditSession::apply_local`
 * - Each command returns a `Patch` naming the blocks it touched and the caret
 *   after the edit, so the UI can re-render only what changed
 *
 * ### 3. Caret by character offset
 * - The caret is a global character offset over the document text
 * - After content is replaced the offset is resolved against the new tree,
 *   clamped to the end
 *
 * ### 4. Read API: render projection
 * - `render` turns tree plus view state into markup, including embed previews
 *   and platform cross-reference icons
 * - The projection is pure; running it twice on the same input gives the
 *   same output
 *
 * ## Module Structure
 *
 * - **`session`**: `EditSession`, dirty tracking, remote apply
 * - **`commands`**: `Cmd` and how each command changes the tree
 * - **`caret`**: offset to block position mapping
 * - **`render`**: the render projection
 * - **`patch`**: edit result metadata
 */

pub mod caret;
pub mod commands;
pub mod patch;
pub mod render;
pub mod session;

pub use caret::{CaretPosition, locate};
pub use commands::Cmd;
pub use patch::Patch;
pub use render::{RenderedBlock, RenderedDocument, TextSegment, render};
pub use session::{DirtyFields, EditSession, ScrollOffsets, ViewState};
