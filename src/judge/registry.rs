use crate::config::types::{JudgeError, Result};
use crate::judge::adapter::HarnessAdapter;
use crate::judge::languages::python::PythonAdapter;

pub fn adapter_for(language: &str) -> Result<Box<dyn HarnessAdapter>> {
    match language {
        "python" | "py" | "python3" => Ok(Box::new(PythonAdapter)),
        _ => Err(JudgeError::Config(format!(
            "unsupported language adapter: {language}"
        ))),
    }
}
