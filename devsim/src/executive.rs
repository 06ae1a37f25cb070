//! Dynamic structure changes.
//!
//! A model attached as an *executive* can alter the model graph while the
//! simulation runs. During its transitions it obtains a [`StructureChanges`]
//! through [`Context::executive`](crate::model::Context::executive) and
//! records the changes it wants to make. Changes are not applied
//! immediately: the coordinator applies the whole batch at the end of the
//! current step, so that no model observes a partially modified graph.
//!
//! Models are addressed by name. Identifiers of created models are
//! allocated immediately and returned to the executive, which may for
//! instance connect a model it has just created within the same batch.

use std::fmt;

use crate::model::{Dynamics, ModelId};

/// A structural change requested by an executive model.
pub(crate) enum StructuralChange {
    Create {
        id: ModelId,
        name: String,
        dynamics: Box<dyn Dynamics>,
        executive: bool,
    },
    Delete {
        name: String,
    },
    Connect {
        source: String,
        output: String,
        destination: String,
        input: String,
    },
    Disconnect {
        source: String,
        output: String,
        destination: String,
        input: String,
    },
    AddObservable {
        view: String,
        model: String,
        port: String,
    },
}

impl fmt::Debug for StructuralChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create {
                id,
                name,
                executive,
                ..
            } => f
                .debug_struct("Create")
                .field("id", id)
                .field("name", name)
                .field("executive", executive)
                .finish_non_exhaustive(),
            Self::Delete { name } => f.debug_struct("Delete").field("name", name).finish(),
            Self::Connect {
                source,
                output,
                destination,
                input,
            } => write!(f, "Connect({source}.{output} -> {destination}.{input})"),
            Self::Disconnect {
                source,
                output,
                destination,
                input,
            } => write!(f, "Disconnect({source}.{output} -> {destination}.{input})"),
            Self::AddObservable { view, model, port } => {
                write!(f, "AddObservable({view}: {model}.{port})")
            }
        }
    }
}

/// A batch of structural changes recorded by an executive model.
pub struct StructureChanges {
    next_id: u64,
    changes: Vec<StructuralChange>,
}

impl StructureChanges {
    pub(crate) fn new(next_id: u64) -> Self {
        Self {
            next_id,
            changes: Vec::new(),
        }
    }

    /// Requests the creation of a regular model.
    ///
    /// The new model is initialized at the end of the current step.
    pub fn create_model(
        &mut self,
        name: impl Into<String>,
        dynamics: impl Dynamics,
    ) -> ModelId {
        self.create(name.into(), Box::new(dynamics), false)
    }

    /// Requests the creation of another executive model.
    pub fn create_executive(
        &mut self,
        name: impl Into<String>,
        dynamics: impl Dynamics,
    ) -> ModelId {
        self.create(name.into(), Box::new(dynamics), true)
    }

    /// Requests the deletion of a model together with its connections and
    /// pending events.
    pub fn delete_model(&mut self, name: impl Into<String>) {
        self.changes
            .push(StructuralChange::Delete { name: name.into() });
    }

    /// Requests a connection from an output port to an input port.
    pub fn connect(
        &mut self,
        source: impl Into<String>,
        output: impl Into<String>,
        destination: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.changes.push(StructuralChange::Connect {
            source: source.into(),
            output: output.into(),
            destination: destination.into(),
            input: input.into(),
        });
    }

    /// Requests the removal of a connection.
    pub fn disconnect(
        &mut self,
        source: impl Into<String>,
        output: impl Into<String>,
        destination: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.changes.push(StructuralChange::Disconnect {
            source: source.into(),
            output: output.into(),
            destination: destination.into(),
            input: input.into(),
        });
    }

    /// Requests the observation of a model port by an existing view.
    pub fn add_observable(
        &mut self,
        view: impl Into<String>,
        model: impl Into<String>,
        port: impl Into<String>,
    ) {
        self.changes.push(StructuralChange::AddObservable {
            view: view.into(),
            model: model.into(),
            port: port.into(),
        });
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if no change was recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn create(&mut self, name: String, dynamics: Box<dyn Dynamics>, executive: bool) -> ModelId {
        let id = ModelId::new(self.next_id);
        self.next_id += 1;
        self.changes.push(StructuralChange::Create {
            id,
            name,
            dynamics,
            executive,
        });

        id
    }

    /// Returns the next free identifier and the recorded changes.
    pub(crate) fn into_parts(self) -> (u64, Vec<StructuralChange>) {
        (self.next_id, self.changes)
    }
}

impl fmt::Debug for StructureChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureChanges")
            .field("next_id", &self.next_id)
            .field("changes", &self.changes)
            .finish()
    }
}
