use crate::cell::CellRecord;
use crate::config::{Layout, RenderMode, SURFACE_ID};
use crate::decoder::{apply_buffer, RenderBuffer};
use crate::error::BridgeError;
use crate::grid::Grid;
use crate::host::{ElementKind, Host};
use crate::scaler::{self, CanvasGeometry};
use crate::simulation::Simulation;
use log::debug;

/// The display target of one bridge. Chosen once at construction.
pub enum Surface<H: Host> {
    Text {
        element: H::Element,
    },
    Canvas {
        element: H::Element,
        context: H::Canvas,
        geometry: CanvasGeometry,
    },
    Grid {
        element: H::Element,
        cells: Grid<H::Element>,
        buffer: RenderBuffer,
    },
}

impl<H: Host> Surface<H> {
    /// Replaces whatever surface currently occupies the identity slot of
    /// `container` with a fresh one of the requested mode.
    pub fn create(host: &H, mode: RenderMode, container: &H::Element, layout: &Layout) -> Result<Self, BridgeError> {
        if host.remove_child_by_id(container, SURFACE_ID) {
            debug!("Removed previous surface from container");
        }

        host.set_flex_layout(container)?;

        let surface = match mode {
            RenderMode::Text => {
                let element = host.create_element(ElementKind::Text, container)?;
                discard_on_error(host, &element, host.style_text(&element))?;

                Surface::Text { element }
            }
            RenderMode::Canvas2d => {
                let element = host.create_element(ElementKind::Canvas, container)?;
                let (context, geometry) = discard_on_error(host, &element, prepare_canvas(host, &element, layout))?;

                debug!(
                    "Canvas {}x{} device px at ratio {}",
                    geometry.device_width(),
                    geometry.device_height(),
                    geometry.ratio
                );

                Surface::Canvas {
                    element,
                    context,
                    geometry,
                }
            }
            RenderMode::Html => {
                let element = host.create_element(ElementKind::Block, container)?;
                let cells = discard_on_error(host, &element, build_cell_pool(host, &element, layout))?;

                Surface::Grid {
                    element,
                    cells,
                    buffer: RenderBuffer::new(layout.grid),
                }
            }
        };

        host.set_id(surface.element(), SURFACE_ID);

        Ok(surface)
    }

    pub fn mode(&self) -> RenderMode {
        match self {
            Surface::Text { .. } => RenderMode::Text,
            Surface::Canvas { .. } => RenderMode::Canvas2d,
            Surface::Grid { .. } => RenderMode::Html,
        }
    }

    pub fn element(&self) -> &H::Element {
        match self {
            Surface::Text { element } => element,
            Surface::Canvas { element, .. } => element,
            Surface::Grid { element, .. } => element,
        }
    }

    /// Redraws from the simulation's current state.
    pub fn draw<S: Simulation<H::Canvas>>(&mut self, host: &H, simulation: &mut S) -> Result<(), BridgeError> {
        match self {
            Surface::Text { element } => {
                host.set_text(element, &simulation.render_to_string());
            }
            Surface::Canvas {
                context, geometry, ..
            } => {
                simulation.render_to_canvas(context, geometry.cell_width, geometry.cell_height);
            }
            Surface::Grid { cells, buffer, .. } => {
                simulation.fill_render_buffer(buffer.as_mut_slice());
                apply_buffer(buffer.as_slice(), cells, |cell, record| host.paint_cell(cell, record))?;
            }
        }

        Ok(())
    }

    pub fn remove(self, host: &H) {
        host.remove(self.element());
    }
}

/// A half-built surface has no id yet, so it must not outlive the failure.
fn discard_on_error<H: Host, T>(host: &H, element: &H::Element, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
    if result.is_err() {
        host.remove(element);
    }

    result
}

fn prepare_canvas<H: Host>(
    host: &H,
    element: &H::Element,
    layout: &Layout,
) -> Result<(H::Canvas, CanvasGeometry), BridgeError> {
    let context = host.canvas_context(element)?;
    let geometry = CanvasGeometry::new(layout, host.device_pixel_ratio(), host.backing_store_ratio(&context));

    host.size_canvas(element, &geometry)?;
    scaler::configure(&context, &geometry)?;

    Ok((context, geometry))
}

fn build_cell_pool<H: Host>(host: &H, element: &H::Element, layout: &Layout) -> Result<Grid<H::Element>, BridgeError> {
    let blank = CellRecord::blank();

    Grid::try_new(layout.grid, &mut |x, _| {
        let cell = host.create_element(ElementKind::Cell, element)?;
        host.paint_cell(&cell, &blank)?;

        // one line break closes every row
        if x + 1 == layout.grid.width {
            host.create_element(ElementKind::LineBreak, element)?;
        }

        Ok(cell)
    })
}
