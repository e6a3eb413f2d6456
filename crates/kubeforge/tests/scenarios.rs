use std::{fs, path::Path};

use indoc::indoc;
use kubeforge::{
    Project,
    api::FieldType,
    marker::Literal,
    project::Error,
    rbac::{DEFAULT_VERBS, READ_VERBS, Rule, STATUS_VERBS},
};
use tempfile::TempDir;

fn write(dir: &TempDir, path: &str, content: &str) {
    let path = dir.path().join(path);
    fs::create_dir_all(path.parent().expect("path must have a parent"))
        .expect("directory must be created");
    fs::write(path, content).expect("file must be written");
}

fn load(dir: &TempDir, config: &str) -> Result<Project, Error> {
    Project::load(dir.path().join(config))
}

const WEBAPP: &str = indoc! {"
    name: webapp
    kind: StandaloneWorkload
    spec:
      api:
        domain: acme.com
        group: apps
        version: v1alpha1
        kind: WebApp
        clusterScoped: false
      companionCliRootcmd:
        name: webappctl
      resources:
        - manifests/*.yaml
"};

#[test]
fn standalone_workload_with_a_single_field() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(&dir, "workload.yaml", WEBAPP);
    write(
        &dir,
        "manifests/deployment.yaml",
        indoc! {"
            apiVersion: apps/v1
            kind: Deployment
            metadata:
              name: web-app
              namespace: default
            spec:
              replicas: 2  # +operator-builder:field:name=replicas,type=int,default=2
              template:
                spec:
                  containers:
                    - name: web
                      image: nginx:1.27
        "},
    );

    let project = load(&dir, "workload.yaml").expect("project must build");
    let workload = &project.root;

    assert_eq!(workload.package_name, "webapp");
    assert_eq!(workload.api_fields.children.len(), 1);
    let replicas = &workload.api_fields.children[0];
    assert_eq!(replicas.name, "Replicas");
    assert_eq!(replicas.field_type, FieldType::Int);
    assert_eq!(replicas.default, Some(Literal::Int(2)));

    let children: Vec<_> = workload.child_resources().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].unique_name, "DeploymentDefaultWebApp");
    assert!(
        children[0]
            .source_code
            .contains("\"replicas\": parent.Spec.Replicas,")
    );
    assert_eq!(workload.create_funcs, ["CreateDeploymentDefaultWebApp"]);

    let manifest = &workload.manifests[0];
    assert!(manifest.mutated_content.contains("replicas: !!var parent.Spec.Replicas\n"));
    assert!(!manifest.mutated_content.contains("+operator-builder"));
    assert_eq!(manifest.source_file_name, "deployment.go");

    assert_eq!(
        workload.rbac.rules(),
        vec![
            Rule::resource("apps", "deployments", DEFAULT_VERBS),
            Rule::resource("apps.acme.com", "webapps", DEFAULT_VERBS),
            Rule::resource("apps.acme.com", "webapps/status", STATUS_VERBS),
        ]
    );

    let command = workload
        .root_command
        .as_ref()
        .expect("root command must be declared");
    assert_eq!(command.description, "Manage webapp workload");
}

#[test]
fn fields_from_several_manifests_share_structs() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(&dir, "workload.yaml", WEBAPP);
    write(
        &dir,
        "manifests/a-tag.yaml",
        indoc! {r#"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: image-tag
            data:
              tag: v1 # +operator-builder:field:name=image.tag,type=string,default="v1"
        "#},
    );
    write(
        &dir,
        "manifests/b-repository.yaml",
        indoc! {r#"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: image-repository
            data:
              repository: busybox # +operator-builder:field:name=image.repository,type=string,default="busybox"
        "#},
    );

    let project = load(&dir, "workload.yaml").expect("project must build");
    let workload = &project.root;

    let image = workload
        .api_fields
        .find("image")
        .expect("image struct must exist");
    assert_eq!(image.field_type, FieldType::Struct);
    assert_eq!(image.struct_name().as_deref(), Some("SpecImage"));
    assert_eq!(
        image
            .children
            .iter()
            .map(|child| child.name.as_str())
            .collect::<Vec<_>>(),
        ["Tag", "Repository"]
    );

    assert!(workload.sample.ends_with(indoc! {r#"
        spec:
          image:
            tag: "v1"
            repository: "busybox"
    "#}));
    assert_eq!(
        workload
            .manifests
            .iter()
            .map(|manifest| manifest.source_file_name.as_str())
            .collect::<Vec<_>>(),
        ["a_tag.go", "b_repository.go"]
    );
}

fn platform(components: &[&str]) -> String {
    let mut config = indoc! {"
        name: platform
        kind: WorkloadCollection
        spec:
          api:
            domain: acme.com
            group: platform
            version: v1alpha1
            kind: Platform
    "}
    .to_owned();

    for component in components {
        config.push_str("---\n");
        config.push_str(component);
    }
    config
}

const CACHE_TIER: &str = indoc! {"
    name: CacheTier
    kind: ComponentWorkload
    spec:
      api:
        group: platform
        version: v1alpha1
        kind: CacheTier
      dependencies:
        - DbTier
"};

const DB_TIER: &str = indoc! {"
    name: DbTier
    kind: ComponentWorkload
    spec:
      api:
        group: platform
        version: v1alpha1
        kind: DbTier
"};

#[test]
fn collection_components_are_linked() {
    let forward = TempDir::new().expect("temp dir must be created");
    write(&forward, "platform.yaml", &platform(&[CACHE_TIER, DB_TIER]));
    let reversed = TempDir::new().expect("temp dir must be created");
    write(&reversed, "platform.yaml", &platform(&[DB_TIER, CACHE_TIER]));

    let project = load(&forward, "platform.yaml").expect("project must build");
    let reversed = load(&reversed, "platform.yaml").expect("project must build");

    assert_eq!(project.dependency_graph, reversed.dependency_graph);
    assert_eq!(project.components.len(), 2);

    for component in &project.components {
        assert_eq!(component.collection.as_deref(), Some("Platform"));
        assert_eq!(component.api.domain, "acme.com");

        let name = component
            .api_fields
            .find("collection.name")
            .expect("collection name must be added");
        assert!(name.is_required());
        let namespace = component
            .api_fields
            .find("collection.namespace")
            .expect("collection namespace must be added");
        assert_eq!(namespace.default, Some(Literal::String(String::new())));
    }

    let cache = project
        .workload("CacheTier")
        .expect("cache tier must exist");
    assert_eq!(cache.component_dependencies, ["DbTier"]);
    assert!(cache.rbac.rules().contains(&Rule::resource(
        "platform.acme.com",
        "platforms",
        READ_VERBS
    )));
    assert!(project.root.api_fields.find("collection").is_none());
}

#[test]
fn unknown_dependencies_are_fatal() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(&dir, "platform.yaml", &platform(&[CACHE_TIER]));

    let error = load(&dir, "platform.yaml").expect_err("missing peers must fail");
    let Error::ResolveDependencies { source } = error else {
        panic!("expected a dependency error, got {error:?}");
    };
    assert_eq!(source.missing["CacheTier"], ["DbTier"]);
}

#[test]
fn cluster_roles_grant_their_rules() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(&dir, "workload.yaml", WEBAPP);
    write(
        &dir,
        "manifests/role.yaml",
        indoc! {r#"
            apiVersion: rbac.authorization.k8s.io/v1
            kind: ClusterRole
            metadata:
              name: config-reader
            rules:
              - apiGroups: [""]
                resources: ["secrets", "configmaps"]
                verbs: ["get", "list"]
        "#},
    );

    let project = load(&dir, "workload.yaml").expect("project must build");
    let rules = project.root.rbac.rules();

    for expected in [
        Rule::resource("rbac.authorization.k8s.io", "clusterroles", DEFAULT_VERBS),
        Rule::resource("core", "secrets", &["get", "list"]),
        Rule::resource("core", "configmaps", &["get", "list"]),
    ] {
        assert!(rules.contains(&expected), "missing rule {expected:?}");
    }
    assert_eq!(rules.len(), 5);
}

#[test]
fn colliding_manifest_names_escalate() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(
        &dir,
        "workload.yaml",
        &WEBAPP.replace("manifests/*.yaml", "\"**/name.yaml\""),
    );
    for (path, name) in [
        ("a/b/name.yaml", "first"),
        ("c/d/name.yaml", "second"),
        ("e/b/name.yaml", "third"),
    ] {
        write(
            &dir,
            path,
            &format!("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {name}\n"),
        );
    }

    let project = load(&dir, "workload.yaml").expect("project must build");
    let names: Vec<_> = project
        .root
        .manifests
        .iter()
        .map(|manifest| (manifest.relative_path.as_str(), manifest.source_file_name.as_str()))
        .collect();

    assert_eq!(
        names,
        [
            ("a/b/name.yaml", "a_b_name.go"),
            ("c/d/name.yaml", "d_name.go"),
            ("e/b/name.yaml", "e_b_name.go"),
        ]
    );
}

#[test]
fn collection_markers_bind_to_the_collection() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(
        &dir,
        "platform.yaml",
        &platform(&[]).replace(
            "kind: Platform\n",
            "kind: Platform\n  resources:\n    - settings.yaml\n",
        ),
    );
    write(
        &dir,
        "settings.yaml",
        indoc! {r#"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: platform-settings
              namespace: platform-system # +operator-builder:collection:field:name=namespace,type=string,default="platform-system"
            data:
              cacheEnabled: "true" # +operator-builder:collection:field:name=cache.enabled,type=bool,default=true
        "#},
    );
    write(
        &dir,
        "components/cache.yaml",
        indoc! {"
            name: CacheTier
            kind: ComponentWorkload
            spec:
              api:
                group: platform
                version: v1alpha1
                kind: CacheTier
              resources:
                - deployment.yaml
        "},
    );
    write(
        &dir,
        "components/deployment.yaml",
        indoc! {"
            # +operator-builder:resource:collectionField=cache.enabled,include
            apiVersion: apps/v1
            kind: Deployment
            metadata:
              name: cache
              namespace: platform-system # +operator-builder:collection:field:name=namespace,type=string
            spec:
              replicas: 1 # +operator-builder:field:name=cache.replicas,type=int,default=1
        "},
    );
    let config = fs::read_to_string(dir.path().join("platform.yaml")).expect("config must exist");
    write(
        &dir,
        "platform.yaml",
        &config.replace(
            "kind: Platform\n",
            "kind: Platform\n  componentFiles:\n    - components/cache.yaml\n",
        ),
    );

    let project = load(&dir, "platform.yaml").expect("project must build");

    let collection = &project.root;
    assert!(collection.api_fields.find("namespace").is_some());
    assert!(collection.api_fields.find("cache.enabled").is_some());
    let settings = &collection.manifests[0];
    assert!(settings.mutated_content.contains("parent.Spec.Namespace"));
    assert!(!settings.mutated_content.contains("collection.Spec"));

    let cache = project.workload("CacheTier").expect("cache tier must exist");
    assert!(cache.api_fields.find("cache.replicas").is_some());
    assert!(cache.api_fields.find("namespace").is_none());

    let deployment = cache
        .child_resources()
        .next()
        .expect("deployment must be analyzed");
    assert_eq!(deployment.unique_name, "DeploymentNamespaceCache");
    assert!(
        deployment
            .source_code
            .contains("\"namespace\": collection.Spec.Namespace,")
    );
    assert_eq!(
        deployment.include_code,
        ["if !collection.Spec.Cache.Enabled {\n\treturn []client.Object{}, nil\n}\n"]
    );
}

#[test]
fn project_model_serializes() {
    let dir = TempDir::new().expect("temp dir must be created");
    write(&dir, "workload.yaml", WEBAPP);
    write(
        &dir,
        "manifests/service.yaml",
        indoc! {r#"
            apiVersion: v1
            kind: Service
            metadata:
              name: web
            spec:
              type: ClusterIP # +operator-builder:field:name=serviceType,type=string,default="ClusterIP"
        "#},
    );

    let project = load(&dir, "workload.yaml").expect("project must build");
    let value = serde_json::to_value(&project).expect("project must serialize");

    assert_eq!(value["root"]["name"], "webapp");
    assert_eq!(value["root"]["kind"], "StandaloneWorkload");
    assert_eq!(
        value["root"]["manifests"][0]["childResources"][0]["uniqueName"],
        "ServiceWeb"
    );
    assert_eq!(
        value["root"]["rootCommand"]["varName"],
        "Webappctl"
    );
    assert!(Path::new(value["root"]["manifests"][0]["path"].as_str().unwrap_or_default())
        .ends_with("manifests/service.yaml"));
}

#[test]
fn samples_do_not_depend_on_manifest_order() {
    fn config_map(name: &str, image: &str) -> String {
        format!(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {name}\ndata:\n  image: {image} # +operator-builder:field:name=image,type=string\n"
        )
    }

    let build = |first: &str, second: &str| {
        let dir = TempDir::new().expect("temp dir must be created");
        write(&dir, "workload.yaml", WEBAPP);
        write(&dir, "manifests/a.yaml", &config_map("first", first));
        write(&dir, "manifests/b.yaml", &config_map("second", second));
        load(&dir, "workload.yaml")
            .expect("project must build")
            .root
            .sample
    };

    let forward = build("nginx", "busybox");
    let backward = build("busybox", "nginx");

    assert_eq!(forward, backward);
    assert!(forward.contains("image: \"busybox\""));
}
