use std::fmt;
use std::path::Path;

/// Growable command line. Renders to a single space-joined description and
/// converts into an argument vector for spawning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmd {
    tokens: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            tokens: vec![program.into()],
        }
    }

    pub fn from_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.tokens.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Splits a flag string such as `"-Wall -O2"` on whitespace.
    pub fn flags(self, flags: &str) -> Self {
        self.args(flags.split_whitespace())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn into_argv(self) -> Vec<String> {
        self.tokens
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Compiler invocations used by project auto-mode.
#[derive(Debug, Clone)]
pub struct Toolchain {
    compiler: String,
    compile_flags: String,
    link_flags: String,
}

impl Toolchain {
    pub fn new(compiler: String, compile_flags: String, link_flags: String) -> Self {
        Self {
            compiler,
            compile_flags,
            link_flags,
        }
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// One batched `-MM` invocation listing the header dependencies of
    /// every source.
    pub fn scan(&self, sources: &[&Path]) -> Cmd {
        sources.iter().fold(
            Cmd::new(self.compiler.as_str())
                .flags(&self.compile_flags)
                .arg("-MM"),
            |cmd, source| cmd.path(source),
        )
    }

    pub fn compile(&self, source: &Path, object: &Path) -> Cmd {
        Cmd::new(self.compiler.as_str())
            .flags(&self.compile_flags)
            .arg("-c")
            .path(source)
            .arg("-o")
            .path(object)
    }

    pub fn link(&self, objects: &[&Path], output: &Path) -> Cmd {
        objects
            .iter()
            .fold(Cmd::new(self.compiler.as_str()), |cmd, object| cmd.path(object))
            .flags(&self.link_flags)
            .arg("-o")
            .path(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_joins_with_single_spaces() {
        let cmd = Cmd::new("cc").arg("-c").args(["a.c", "-o", "a.o"]);
        assert_eq!(cmd.render(), "cc -c a.c -o a.o");
        assert_eq!(cmd.len(), 5);
    }

    #[test]
    fn test_flags_skip_extra_whitespace() {
        let cmd = Cmd::new("cc").flags("  -Wall   -O2 ");
        assert_eq!(cmd.into_argv(), vec!["cc", "-Wall", "-O2"]);
    }

    #[test]
    fn test_toolchain_commands() {
        let tc = Toolchain::new("c++".to_string(), "-Wall".to_string(), "-lm".to_string());

        let scan = tc.scan(&[Path::new("src/a.cpp"), Path::new("src/b.cpp")]);
        assert_eq!(scan.render(), "c++ -Wall -MM src/a.cpp src/b.cpp");

        let compile = tc.compile(Path::new("src/a.cpp"), Path::new("build/a.o"));
        assert_eq!(compile.render(), "c++ -Wall -c src/a.cpp -o build/a.o");

        let link = tc.link(
            &[Path::new("build/a.o"), Path::new("build/b.o")],
            Path::new("build/main"),
        );
        assert_eq!(link.render(), "c++ build/a.o build/b.o -lm -o build/main");
    }
}
