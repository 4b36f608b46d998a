//! Framework detection for component contexts

use super::language::Language;
use super::structure::ProjectStructure;

/// Frameworks with a dedicated devfile stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Framework {
    // Java frameworks
    SpringBoot,
    Quarkus,
    Vertx,
    Micronaut,
    OpenLiberty,

    // JavaScript/TypeScript frameworks
    Express,
    Next,
    React,
    Vue,
    Angular,
    Svelte,
    Nest,

    // Python frameworks
    Django,
    Flask,
    FastAPI,

    // Go frameworks
    Gin,
    Echo,
    Fiber,

    // PHP frameworks
    Laravel,
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::SpringBoot => write!(f, "Spring Boot"),
            Framework::Quarkus => write!(f, "Quarkus"),
            Framework::Vertx => write!(f, "Vert.x"),
            Framework::Micronaut => write!(f, "Micronaut"),
            Framework::OpenLiberty => write!(f, "Open Liberty"),
            Framework::Express => write!(f, "Express"),
            Framework::Next => write!(f, "Next.js"),
            Framework::React => write!(f, "React"),
            Framework::Vue => write!(f, "Vue"),
            Framework::Angular => write!(f, "Angular"),
            Framework::Svelte => write!(f, "Svelte"),
            Framework::Nest => write!(f, "NestJS"),
            Framework::Django => write!(f, "Django"),
            Framework::Flask => write!(f, "Flask"),
            Framework::FastAPI => write!(f, "FastAPI"),
            Framework::Gin => write!(f, "Gin"),
            Framework::Echo => write!(f, "Echo"),
            Framework::Fiber => write!(f, "Fiber"),
            Framework::Laravel => write!(f, "Laravel"),
        }
    }
}

/// Framework detector
///
/// Dependency markers are checked in order, so more specific frameworks
/// (Next.js before React) come first.
pub struct FrameworkDetector {
    java_markers: Vec<(&'static str, Framework)>,
    js_markers: Vec<(&'static str, Framework)>,
    python_markers: Vec<(&'static str, Framework)>,
    go_markers: Vec<(&'static str, Framework)>,
    php_markers: Vec<(&'static str, Framework)>,
}

impl FrameworkDetector {
    pub fn new() -> Self {
        Self {
            java_markers: vec![
                ("spring-boot", Framework::SpringBoot),
                ("io.quarkus", Framework::Quarkus),
                ("io.vertx", Framework::Vertx),
                ("io.micronaut", Framework::Micronaut),
                ("openliberty", Framework::OpenLiberty),
                ("liberty-maven-plugin", Framework::OpenLiberty),
            ],
            js_markers: vec![
                ("\"next\"", Framework::Next),
                ("\"@nestjs/core\"", Framework::Nest),
                ("\"@angular/core\"", Framework::Angular),
                ("\"svelte\"", Framework::Svelte),
                ("\"vue\"", Framework::Vue),
                ("\"react\"", Framework::React),
                ("\"express\"", Framework::Express),
            ],
            python_markers: vec![
                ("django", Framework::Django),
                ("fastapi", Framework::FastAPI),
                ("flask", Framework::Flask),
            ],
            go_markers: vec![
                ("gin-gonic/gin", Framework::Gin),
                ("labstack/echo", Framework::Echo),
                ("gofiber/fiber", Framework::Fiber),
            ],
            php_markers: vec![("laravel/framework", Framework::Laravel)],
        }
    }

    pub fn detect(&self, structure: &ProjectStructure, language: &Language) -> Option<Framework> {
        let (manifests, markers) = match language {
            Language::Java => (&["pom.xml", "build.gradle", "build.gradle.kts"][..], &self.java_markers),
            Language::JavaScript | Language::TypeScript => (&["package.json"][..], &self.js_markers),
            Language::Python => (
                &["requirements.txt", "pyproject.toml", "Pipfile", "setup.py"][..],
                &self.python_markers,
            ),
            Language::Go => (&["go.mod"][..], &self.go_markers),
            Language::Php => (&["composer.json"][..], &self.php_markers),
            _ => return None,
        };

        structure
            .build_files()
            .filter(|f| manifests.contains(&f.file_name()))
            .filter_map(|f| std::fs::read_to_string(&f.path).ok())
            .find_map(|content| {
                let content = content.to_lowercase();
                markers
                    .iter()
                    .find(|(marker, _)| content.contains(marker))
                    .map(|(_, framework)| framework.clone())
            })
    }
}

impl Default for FrameworkDetector {
    fn default() -> Self {
        Self::new()
    }
}
