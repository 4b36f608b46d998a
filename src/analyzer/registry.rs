//! Devfile stack catalog
//!
//! Maps a detected language/framework pair to a registry stack and the
//! Dockerfile of that stack's sample project.

use super::framework::Framework;
use super::language::Language;

/// A registry stack matched for a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMatch {
    pub stack: &'static str,
    pub devfile_url: String,
    pub dockerfile_url: String,
}

struct Stack {
    name: &'static str,
    sample: &'static str,
}

/// Looks up registry stacks
#[derive(Debug, Clone)]
pub struct StackCatalog {
    registry_url: String,
}

impl StackCatalog {
    pub fn new(registry_url: &str) -> Self {
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn lookup(&self, language: &Language, framework: Option<&Framework>) -> Option<StackMatch> {
        let stack = stack_for(language, framework)?;
        Some(StackMatch {
            stack: stack.name,
            devfile_url: format!("{}/devfiles/{}", self.registry_url, stack.name),
            dockerfile_url: format!(
                "https://raw.githubusercontent.com/devfile-samples/{}/main/docker/Dockerfile",
                stack.sample
            ),
        })
    }
}

fn stack_for(language: &Language, framework: Option<&Framework>) -> Option<Stack> {
    let (name, sample) = match (language, framework) {
        (Language::Java, Some(Framework::SpringBoot)) => {
            ("java-springboot", "devfile-sample-java-springboot-basic")
        }
        (Language::Java, Some(Framework::Quarkus)) => ("java-quarkus", "devfile-sample-code-with-quarkus"),
        (Language::Java, Some(Framework::Vertx)) => ("java-vertx", "devfile-sample-java-vertx"),
        (Language::Java, Some(Framework::OpenLiberty)) => ("java-openliberty", "devfile-sample-java-openliberty"),
        (Language::Java, _) => ("java-maven", "devfile-sample-java-maven"),
        (Language::JavaScript | Language::TypeScript, Some(Framework::Next)) => {
            ("nodejs-nextjs", "devfile-sample-nextjs")
        }
        (Language::JavaScript | Language::TypeScript, Some(Framework::React)) => {
            ("nodejs-react", "devfile-sample-react")
        }
        (Language::JavaScript | Language::TypeScript, Some(Framework::Vue)) => {
            ("nodejs-vue", "devfile-sample-vue")
        }
        (Language::JavaScript | Language::TypeScript, Some(Framework::Angular)) => {
            ("nodejs-angular", "devfile-sample-angular")
        }
        (Language::JavaScript | Language::TypeScript, Some(Framework::Svelte)) => {
            ("nodejs-svelte", "devfile-sample-svelte")
        }
        (Language::JavaScript | Language::TypeScript, _) => ("nodejs", "devfile-sample-nodejs-basic"),
        (Language::Python, Some(Framework::Django)) => ("python-django", "devfile-sample-django"),
        (Language::Python, _) => ("python", "devfile-sample-python-basic"),
        (Language::Go, _) => ("go", "devfile-sample-go-basic"),
        (Language::CSharp, _) => ("dotnet60", "devfile-sample-dotnet60-basic"),
        (Language::Php, Some(Framework::Laravel)) => ("php-laravel", "devfile-sample-php-laravel"),
        _ => return None,
    };
    Some(Stack { name, sample })
}
