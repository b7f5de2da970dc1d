//! Webcam human matting with Robust Video Matting.
//!
//! Camera frames go through [`matting::RobustVideoMattingPredictor`], which
//! threads RVM's recurrent state from frame to frame, and the resulting
//! [`matting::Matte`] is rendered to an output sink.

pub mod capture;
pub mod matting;
pub mod output;
pub mod pipeline;
