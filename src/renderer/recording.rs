use super::backend::{DrawCall, Geometry, Pass, RenderBackend, TextureRef};
use crate::{
    shader::{ProgramId, UniformTable},
    texture::TextureData,
    types::{MeshHandle, TextureId},
    um_error::UmError,
    vertex::Vertex,
};
use log::trace;

/// One backend call as seen by `RecordingBackend`
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    BeginFrame,
    BeginPass(Pass),
    Draw {
        program: ProgramId,
        geometry: Geometry,
        /// Copy of the uniform block at the time of the draw
        uniforms: Vec<u8>,
        textures: Vec<(u32, TextureRef)>,
    },
    EndPass,
    CopyDepth,
    EndFrame,
}

/// A mesh as uploaded, kept so tests can inspect it
#[derive(Clone, Debug)]
pub struct RecordedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Backend that draws nothing and records every call instead. Used for
/// testing the frame graph without a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    dimensions: [u32; 2],
    programs: Vec<(ProgramId, UniformTable)>,
    meshes: Vec<RecordedMesh>,
    textures: Vec<TextureData>,
    events: Vec<Event>,
    in_pass: Option<Pass>,
    out_of_date: bool,
}

impl RecordingBackend {
    #[must_use]
    pub fn new(dimensions: [u32; 2]) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns and forgets the recorded events
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn meshes(&self) -> &[RecordedMesh] {
        &self.meshes
    }

    #[must_use]
    pub fn textures(&self) -> &[TextureData] {
        &self.textures
    }

    #[must_use]
    pub fn loaded_programs(&self) -> Vec<ProgramId> {
        self.programs.iter().map(|(id, _)| *id).collect()
    }

    /// Makes `begin_frame` report an out of date swapchain until cleared
    pub fn set_out_of_date(&mut self, out_of_date: bool) {
        self.out_of_date = out_of_date;
    }

    /// Passes begun, in order
    #[must_use]
    pub fn passes(&self) -> Vec<Pass> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::BeginPass(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Draws recorded during each occurrence of `pass`
    #[must_use]
    pub fn draws_in(&self, pass: Pass) -> Vec<&Event> {
        let mut current = None;
        let mut out = Vec::new();
        for e in &self.events {
            match e {
                Event::BeginPass(p) => current = Some(*p),
                Event::EndPass => current = None,
                Event::Draw { .. } if current == Some(pass) => out.push(e),
                _ => {}
            }
        }
        out
    }

    fn check_pass(&self, call: &str) -> Result<(), UmError> {
        if self.in_pass.is_none() {
            return Err(UmError::invalid_state(
                format!("{call} outside a pass"),
                "RecordingBackend",
            ));
        }
        Ok(())
    }
}

impl RenderBackend for RecordingBackend {
    fn load_program(
        &mut self,
        id: ProgramId,
        table: &UniformTable,
    ) -> Result<(), UmError> {
        self.programs.push((id, table.clone()));
        Ok(())
    }

    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshHandle, UmError> {
        self.meshes.push(RecordedMesh {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        });
        Ok(MeshHandle(self.meshes.len() - 1))
    }

    fn create_texture(
        &mut self,
        data: &TextureData,
    ) -> Result<TextureId, UmError> {
        if !data.is_consistent() {
            return Err(UmError::invalid_parameter(
                "pixel data does not match dimensions",
                "RecordingBackend::create_texture",
            ));
        }
        self.textures.push(data.clone());
        Ok(TextureId(self.textures.len() - 1))
    }

    fn begin_frame(&mut self) -> Result<(), UmError> {
        if self.out_of_date {
            return Err(UmError::SwapchainOutOfDate);
        }
        self.events.push(Event::BeginFrame);
        Ok(())
    }

    fn begin_pass(&mut self, pass: Pass) -> Result<(), UmError> {
        if let Some(open) = self.in_pass {
            return Err(UmError::invalid_state(
                format!("{pass:?} begun inside {open:?}"),
                "RecordingBackend::begin_pass",
            ));
        }
        trace!("begin {:?}", pass);
        self.in_pass = Some(pass);
        self.events.push(Event::BeginPass(pass));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), UmError> {
        self.check_pass("draw")?;
        if let Geometry::Mesh(MeshHandle(i)) = call.geometry {
            if i >= self.meshes.len() {
                return Err(UmError::invalid_parameter(
                    format!("unknown mesh {i}"),
                    "RecordingBackend::draw",
                ));
            }
        }
        self.events.push(Event::Draw {
            program: call.program,
            geometry: call.geometry.clone(),
            uniforms: call.uniforms.to_vec(),
            textures: call.textures.to_vec(),
        });
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), UmError> {
        self.check_pass("end_pass")?;
        self.in_pass = None;
        self.events.push(Event::EndPass);
        Ok(())
    }

    fn copy_depth(&mut self) -> Result<(), UmError> {
        self.events.push(Event::CopyDepth);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), UmError> {
        if self.in_pass.take().is_some() {
            return Err(UmError::invalid_state(
                "end_frame inside a pass",
                "RecordingBackend::end_frame",
            ));
        }
        self.events.push(Event::EndFrame);
        Ok(())
    }

    fn resize(&mut self, dimensions: [u32; 2]) -> Result<(), UmError> {
        self.dimensions = dimensions;
        Ok(())
    }

    fn dimensions(&self) -> [u32; 2] {
        self.dimensions
    }
}
