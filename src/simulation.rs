/// The external turn-based engine driven by the bridge.
///
/// `C` is the drawing context handed to [`Simulation::render_to_canvas`].
pub trait Simulation<C> {
    /// Advances one logical step.
    fn tick(&mut self);

    fn render_to_string(&mut self) -> String;

    /// `scale_x`/`scale_y` are the logical width and height of one cell.
    fn render_to_canvas(&mut self, context: &C, scale_x: f64, scale_y: f64);

    /// Fills `buffer` with one 7-byte record per cell, row-major.
    fn fill_render_buffer(&mut self, buffer: &mut [u8]);

    /// Pointer position, both axes in `[0, 1]`.
    fn move_mouse(&mut self, x: f64, y: f64);

    fn press_key(&mut self, code: u32);

    /// Releases engine-side resources. Called once, from `dispose`.
    fn free(&mut self) {}
}
