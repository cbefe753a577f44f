//! Scene error types

use thiserror::Error;

use super::graph::ObjectHandle;
use super::render_object::ObjectType;
use crate::render::RenderError;

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors reported by scene operations
///
/// Every operation that returns one of these has left the scene exactly as
/// it was before the call.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The handle does not name a live object of this scene
    #[error("Object {0:?} is not part of the scene")]
    InvalidHandle(ObjectHandle),

    /// The requested new parent does not name a live object
    #[error("Parent object {0:?} is not part of the scene")]
    ParentNotFound(ObjectHandle),

    /// The edit was prepared for a different kind of object
    #[error("Edit is for a {expected} object but the target is a {actual} object")]
    TypeMismatch {
        /// Type declared by the edit
        expected: ObjectType,
        /// Actual type of the target
        actual: ObjectType,
    },

    /// Null objects (the scene root) are structural and cannot be edited
    #[error("Null objects cannot be modified")]
    NullObjectEdit,

    /// The scene root cannot be removed
    #[error("The scene root cannot be removed")]
    RootRemoval,

    /// Reparenting would make an object its own ancestor
    #[error("Cannot parent {child:?} under {parent:?}: it would create a cycle")]
    CyclicParent {
        /// Object being moved
        child: ObjectHandle,
        /// Requested parent
        parent: ObjectHandle,
    },

    /// The object lacks the model or shader it needs to draw
    #[error("Object '{name}' has no {resource} to draw with")]
    MissingResource {
        /// Object name
        name: String,
        /// `"model"` or `"shader"`
        resource: &'static str,
    },

    /// A byte slice is too small for the record written into it
    #[error("Buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required
        required: usize,
        /// Bytes available
        actual: usize,
    },

    /// The light buffer was used before `create_light_buffer`
    #[error("Light buffer has not been created")]
    LightBufferNotCreated,

    /// Index outside a light group
    #[error("Light index {index} out of range for a group of {len} lights")]
    LightIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of lights in the group
        len: usize,
    },

    /// Backend or asset loader failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
