use colored::*;

/// Turns common compiler/linker failures into a short hint.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Main function missing
        if output.contains("undefined reference to `main'")
            || output.contains("undefined reference to `WinMain")
            || (output.contains("Undefined symbols for architecture")
                && output.contains("\"_main\""))
        {
            return Some(format!(
                "Your program is missing a {} function.",
                "main()".bold().yellow()
            ));
        }

        // 2. Missing library
        if output.contains("undefined reference to") || output.contains("Undefined symbols") {
            return Some(format!(
                "It looks like a {} error.\nA library may be missing: pass it with {} or add {} to the source.",
                "Linker".bold().red(),
                "--libs \"-lname\"".bold().green(),
                "#pragma comment(lib, \"name\")".bold().green()
            ));
        }

        // 3. Missing header
        if output.contains("fatal error: ")
            && (output.contains("No such file or directory") || output.contains("file not found"))
        {
            return Some(format!(
                "It looks like a {} error.\nCheck the include path, or add {} for extra include directories.",
                "Missing Header".bold().red(),
                "--cflags \"-I<dir>\"".bold().green()
            ));
        }

        None
    }
}
