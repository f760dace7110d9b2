pub mod frame_painter;
