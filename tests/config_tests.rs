//! Integration tests reading the fixture layers through the public API.
//!
//! `tests/fixtures/reference.yaml` holds the defaults and
//! `tests/fixtures/application.yaml` the application layer above them.

use layerconf::config::{
    Bean, BeanValue, Config, ConfigEnum, ConfigLoader, ConfigPaths, FieldType, FromConfig,
    OptionalExt, Shape,
};
use layerconf::error::{ConfigError, ErrorKind};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::time::Duration;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load() -> Config {
    let paths = ConfigPaths::with_files(
        vec![fixture("reference.yaml")],
        vec![fixture("application.yaml")],
    );
    ConfigLoader::load_with_paths(paths)
        .expect("fixtures should load")
        .into_config()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Author {
    name: String,
    surname: String,
}

impl FromConfig for Author {
    fn shape() -> Shape {
        Shape::new("Author")
            .field("name", FieldType::String)
            .field("surname", FieldType::String)
    }

    fn from_bean(bean: &Bean) -> layerconf::error::Result<Self> {
        Ok(Self {
            name: bean.string("name")?,
            surname: bean.string("surname")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserStatus {
    Active,
    Banned,
    Pending,
}

impl ConfigEnum for UserStatus {
    const NAME: &'static str = "UserStatus";
    const MEMBERS: &'static [(&'static str, Self)] = &[
        ("ACTIVE", UserStatus::Active),
        ("BANNED", UserStatus::Banned),
        ("PENDING", UserStatus::Pending),
    ];
}

#[test]
fn missing_key_is_missing() {
    let err = load().get_string("non-existent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Missing);
    assert!(matches!(err, ConfigError::Missing { ref path } if path == "non-existent"));
}

#[test]
fn null_value_is_null_not_missing() {
    let conf = load();
    let err = conf.get_string("conf.null_value_key").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullValue);
    assert!(!conf.has_path("conf.null_value_key").unwrap());
    assert!(conf.has_path_or_null("conf.null_value_key").unwrap());
    assert_eq!(conf.get_string("conf.null_value_key").optional().unwrap(), None);
}

#[test]
fn plain_strings() {
    let conf = load();
    assert_eq!(conf.get_string("conf.project_name").unwrap(), "typesafe-config");
    assert_eq!(conf.get_string("predefined.version").unwrap(), "1.0-SNAPSHOT");
    assert_eq!(conf.get_string("conf.login").unwrap(), "admin");
}

#[test]
fn substitutions_across_layers() {
    let conf = load();
    assert_eq!(conf.get_string("conf.project_version").unwrap(), "1.0-SNAPSHOT");
    assert_eq!(conf.get_string("conf.artifact_version").unwrap(), "1.0-SNAPSHOT");
}

#[test]
fn author_object_as_config() {
    let author = load().get_object("conf.author").unwrap().to_config();
    assert_eq!(author.get_string("name").unwrap(), "michal");
    assert_eq!(author.get_string("surname").unwrap(), "tumilowicz");
}

#[test]
fn author_bean() {
    let conf = load();
    let author: Author = conf.bind_as("conf.author").unwrap();
    assert_eq!(
        author,
        Author {
            name: "michal".to_string(),
            surname: "tumilowicz".to_string(),
        }
    );

    let bean = conf.bind("conf.author", &Author::shape()).unwrap();
    assert_eq!(
        bean,
        Bean::new("Author")
            .with("name", BeanValue::String("michal".to_string()))
            .with("surname", BeanValue::String("tumilowicz".to_string()))
    );
}

#[test]
fn persistence_inherits_and_overrides_defaults() {
    let persistence = load().get_object("conf.persistence").unwrap().to_config();
    assert_eq!(persistence.get_string("specification").unwrap(), "JPA");
    assert_eq!(persistence.get_string("provider").unwrap(), "EclipseLink");
    assert!(!persistence.get_bool("cache").unwrap());
    assert_eq!(persistence.get_string("database").unwrap(), "Oracle");
}

#[test]
fn branch_east_inherits_company_name() {
    let branch = load().get_object("conf.branch_east").unwrap();
    let keys: Vec<&str> = branch.keys().collect();
    assert_eq!(keys, ["name", "branch_name"]);

    let branch = branch.to_config();
    assert_eq!(branch.get_string("name").unwrap(), "mtumilowicz holding");
    assert_eq!(branch.get_string("branch_name").unwrap(), "east");
}

#[test]
fn inherited_object_refers_to_its_own_fields() {
    let branch = load().get_config("conf.branch_west").unwrap();
    assert_eq!(branch.get_string("branch_name").unwrap(), "west");
    assert_eq!(branch.get_string("label").unwrap(), "mtumilowicz holding (west)");
}

#[test]
fn web_container_overridden_by_application() {
    assert_eq!(load().get_string("conf.web_container").unwrap(), "GlassFish");
}

#[test]
fn languages_list() {
    assert_eq!(
        load().get_string_list("conf.languages").unwrap(),
        vec!["english", "polish", "french"]
    );
}

#[test]
fn user_statuses_in_declaration_order() {
    let statuses: Vec<UserStatus> = load().get_enum_list("conf.user_status").unwrap();
    let declared: Vec<UserStatus> = UserStatus::MEMBERS.iter().map(|(_, v)| *v).collect();
    assert_eq!(statuses, declared);
}

#[test]
fn unit_strings_from_reference() {
    let conf = load();
    assert_eq!(conf.get_duration("conf.pool.timeout").unwrap(), Duration::from_secs(30));
    assert_eq!(conf.get_bytes("conf.pool.max_size").unwrap(), 512 * 1024);
}

#[test]
fn wrong_type_names_path() {
    let err = load().get_bool("conf.project_name").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongType);
    assert!(err.to_string().contains("conf.project_name"));
}
