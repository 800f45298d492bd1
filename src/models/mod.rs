// Locally stored ONNX models.

pub mod download;
