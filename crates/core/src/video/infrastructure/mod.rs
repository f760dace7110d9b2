pub mod ffmpeg_file_source;
pub mod image_sequence_source;
pub mod png_snapshot_writer;
