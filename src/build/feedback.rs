use colored::*;

/// Maps common backend diagnostics to a hint for the user.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // Project has no CMake entry point
        if output.contains("does not appear to contain CMakeLists.txt") {
            return Some(format!(
                "No {} found at the project root.\nRun {} from the directory that holds it, or pass {}.",
                "CMakeLists.txt".bold().yellow(),
                "kb".bold().green(),
                "-C <dir>".bold().green()
            ));
        }

        // Generated header missing from the include path
        if output.contains("config.h") && output.contains("No such file or directory") {
            return Some(format!(
                "The generated {} is missing.\nRun {} to regenerate it.",
                "config.h".bold().yellow(),
                "kb configure".bold().green()
            ));
        }

        // Config variables not included by CMakeLists.txt
        if output.contains("config.cmake") && output.contains("include could not find") {
            return Some(format!(
                "CMake could not include {}.\nRun {} before building.",
                "build/config.cmake".bold().yellow(),
                "kb configure".bold().green()
            ));
        }

        if output.contains("undefined reference to `main'") {
            return Some(format!(
                "The program is missing a {} function.",
                "main()".bold().yellow()
            ));
        }

        // Usually a module disabled in .config while still referenced
        if output.contains("undefined reference to") {
            return Some(format!(
                "It looks like a {} error.\nA component may be disabled in {} while still referenced.\nCheck it with {}.",
                "Linker".bold().red(),
                ".config".bold().yellow(),
                "kb menuconfig".bold().green()
            ));
        }

        if output.contains("fatal error: ") && output.contains("No such file or directory") {
            return Some(format!(
                "It looks like a {} error.\nCheck the include directories in {}.",
                "Missing Header".bold().red(),
                "CMakeLists.txt".bold().yellow()
            ));
        }

        None
    }
}
