//! Tests for the code generation module

#[cfg(feature = "codegen")]
mod tests {
    use laragen_schema::codegen::{
        ArtifactGenerator, ControllerGenerator, ModelGenerator, ObserverGenerator, PolicyGenerator,
        ResourceGenerator, TemplateGenerator,
    };
    use laragen_schema::{
        CheckConstraint, ColumnInfo, ConstraintAnalyzer, DatabaseSchema, Driver, ForeignKey,
        GenerationOptions, IndexInfo, ModelMetadata, NameResolver, RelationshipDetector,
        TableMetadata,
    };
    use std::sync::Arc;

    /// Helper function to create a small blog schema
    fn create_test_schema() -> DatabaseSchema {
        DatabaseSchema::new(Driver::MySql, "blog")
            .with_table(
                TableMetadata::new("users")
                    .with_columns(vec![
                        ColumnInfo::new("id", "bigint unsigned").auto_increment(),
                        ColumnInfo::new("name", "varchar(255)").with_comment("Display name"),
                        ColumnInfo::new("email", "varchar(255)"),
                        ColumnInfo::new("password", "varchar(255)"),
                        ColumnInfo::new("api_key", "varchar(64)").nullable(),
                        ColumnInfo::new("is_admin", "tinyint(1)"),
                        ColumnInfo::new("created_at", "timestamp").nullable(),
                        ColumnInfo::new("updated_at", "timestamp").nullable(),
                    ])
                    .with_primary_key(&["id"])
                    .with_index(IndexInfo::new("PRIMARY", &["id"]).primary())
                    .with_index(IndexInfo::new("users_email_unique", &["email"]).unique()),
            )
            .with_table(
                TableMetadata::new("posts")
                    .with_columns(vec![
                        ColumnInfo::new("id", "bigint unsigned").auto_increment(),
                        ColumnInfo::new("user_id", "bigint unsigned"),
                        ColumnInfo::new("title", "varchar(200)"),
                        ColumnInfo::new("price", "decimal(8,2)"),
                        ColumnInfo::new("options", "json").nullable(),
                        ColumnInfo::new("created_at", "timestamp").nullable(),
                        ColumnInfo::new("updated_at", "timestamp").nullable(),
                        ColumnInfo::new("deleted_at", "timestamp").nullable(),
                    ])
                    .with_primary_key(&["id"])
                    .with_foreign_key(ForeignKey {
                        on_delete: Some("CASCADE".to_string()),
                        ..ForeignKey::new("user_id", "users", "id")
                    })
                    .with_index(IndexInfo::new("PRIMARY", &["id"]).primary())
                    .with_index(IndexInfo::new("posts_user_id_foreign", &["user_id"])),
            )
            .with_table(
                TableMetadata::new("tags")
                    .with_columns(vec![
                        ColumnInfo::new("slug", "varchar(64)"),
                        ColumnInfo::new("label", "varchar(64)"),
                    ])
                    .with_primary_key(&["slug"]),
            )
            .with_table(
                TableMetadata::new("post_tag")
                    .with_columns(vec![
                        ColumnInfo::new("post_id", "bigint unsigned"),
                        ColumnInfo::new("tag_slug", "varchar(64)"),
                    ])
                    .with_primary_key(&["post_id", "tag_slug"])
                    .with_foreign_key(ForeignKey::new("post_id", "posts", "id"))
                    .with_foreign_key(ForeignKey::new("tag_slug", "tags", "slug")),
            )
            .with_table(
                TableMetadata::new("comments")
                    .with_columns(vec![
                        ColumnInfo::new("id", "int").auto_increment(),
                        ColumnInfo::new("commentable_type", "varchar(255)"),
                        ColumnInfo::new("commentable_id", "bigint unsigned"),
                        ColumnInfo::new("rating", "int"),
                    ])
                    .with_primary_key(&["id"]),
            )
    }

    fn metadata(schema: &DatabaseSchema, table: &str) -> ModelMetadata {
        let detector = RelationshipDetector::new(schema);
        let mut analyzer = ConstraintAnalyzer::new(schema);
        let analysis = analyzer.analyze_table(table).unwrap().clone();

        let mut meta = ModelMetadata::from_table(
            schema.table(table).unwrap(),
            &NameResolver::default(),
            "App\\Models",
        )
        .unwrap()
        .with_relations(&detector, true, true, true)
        .with_analysis(analysis);
        if table == "comments" {
            meta.check_constraints.push(CheckConstraint {
                name: "comments_rating_check".to_string(),
                definition: "rating between 1 and 5".to_string(),
            });
        }
        meta
    }

    fn templates() -> Arc<TemplateGenerator> {
        Arc::new(TemplateGenerator::with_builtin_templates().unwrap())
    }

    fn render_model(table: &str, options: &GenerationOptions) -> String {
        let schema = create_test_schema();
        let meta = metadata(&schema, table);
        ModelGenerator::new(templates())
            .generate(&meta, options)
            .unwrap()
            .content
    }

    #[test]
    fn test_user_model() {
        let code = render_model("users", &GenerationOptions::default());

        assert!(code.starts_with("<?php"));
        assert!(code.contains("namespace App\\Models;"));
        assert!(code.contains("use Illuminate\\Database\\Eloquent\\Model;"));
        assert!(code.contains("class User extends Model"));
        assert!(code.contains("protected $table = 'users';"));
        assert!(!code.contains("$primaryKey"));
        assert!(!code.contains("$timestamps"));

        assert!(code.contains("'name',"));
        assert!(code.contains("'email',"));
        assert!(!code.contains("'id',"));
        assert!(!code.contains("'created_at',"));

        // hidden
        assert!(code.contains("protected $hidden = ["));
        assert!(code.contains("'api_key',"));

        // casts
        assert!(code.contains("'is_admin' => 'boolean',"));
        assert!(!code.contains("'created_at' =>"));

        // docblock
        assert!(code.contains(" * @property int $id (PK)"));
        assert!(code.contains(" * @property string $name Display name"));
        assert!(code.contains(" * @property string $email (UNIQUE)"));
        assert!(code.contains(" * @property ?string $api_key"));
        assert!(code.contains(
            " * @property-read \\Illuminate\\Database\\Eloquent\\Collection<int, Post> $posts"
        ));

        assert!(code.contains("public function posts(): HasMany"));
        assert!(code.contains("return $this->hasMany(Post::class, 'user_id');"));
        assert!(code.contains("use Illuminate\\Database\\Eloquent\\Relations\\HasMany;"));
    }

    #[test]
    fn test_post_model_relations_and_soft_deletes() {
        let code = render_model("posts", &GenerationOptions::default());

        assert!(code.contains("use Illuminate\\Database\\Eloquent\\SoftDeletes;"));
        assert!(code.contains("    use SoftDeletes;"));
        assert!(code.contains("'price' => 'decimal:2',"));
        assert!(code.contains("'options' => 'array',"));
        assert!(!code.contains("'deleted_at',"));

        assert!(code.contains("public function user(): BelongsTo"));
        assert!(code.contains("return $this->belongsTo(User::class, 'user_id');"));
        assert!(code.contains(
            "return $this->belongsToMany(Tag::class, 'post_tag', 'post_id', 'tag_slug');"
        ));
        assert!(code.contains(" * @property int $user_id (FK -> users.id, INDEXED)"));
        assert!(code.contains(" * @return \\Illuminate\\Database\\Eloquent\\Relations\\BelongsTo"));
    }

    #[test]
    fn test_string_and_composite_primary_keys() {
        let tag = render_model("tags", &GenerationOptions::default());
        assert!(tag.contains("protected $primaryKey = 'slug';"));
        assert!(tag.contains("protected $keyType = 'string';"));
        assert!(tag.contains("public $incrementing = false;"));
        assert!(tag.contains("public $timestamps = false;"));
        assert!(tag.contains("return $this->belongsToMany(Post::class, 'post_tag', 'tag_slug', 'post_id');"));

        let pivot = render_model("post_tag", &GenerationOptions::default());
        assert!(pivot.contains("protected $primaryKey = ['post_id', 'tag_slug'];"));
        assert!(pivot.contains("public $incrementing = false;"));
        assert!(!pivot.contains("protected $fillable"));
    }

    #[test]
    fn test_polymorphic_and_constraint_comments() {
        let options = GenerationOptions {
            with_constraints: true,
            with_phpdoc: false,
            ..Default::default()
        };
        let code = render_model("comments", &options);

        assert!(code.contains("public function commentable(): MorphTo"));
        assert!(code.contains(
            "return $this->morphTo('commentable', 'commentable_type', 'commentable_id');"
        ));
        assert!(code.contains("     * Database Constraints"));
        assert!(code.contains("     * Primary Key: id"));
        assert!(code.contains("     *   - comments_rating_check: rating between 1 and 5"));
        assert!(!code.contains("@property"));
    }

    #[test]
    fn test_foreign_key_constraint_comments() {
        let options = GenerationOptions {
            with_constraints: true,
            ..Default::default()
        };
        let code = render_model("posts", &options);
        assert!(code.contains("     *   - user_id -> users.id (ON DELETE CASCADE)"));
        assert!(code.contains("     *   - posts_user_id_foreign: user_id ASC"));
    }

    #[test]
    fn test_controller() {
        let schema = create_test_schema();
        let meta = metadata(&schema, "posts");
        let artifact = ControllerGenerator::new(templates())
            .generate(&meta, &GenerationOptions::default())
            .unwrap();

        assert_eq!(artifact.name, "PostController");
        let code = artifact.content;
        assert!(code.contains("namespace App\\Http\\Controllers;"));
        assert!(code.contains("use App\\Models\\Post;"));
        assert!(code.contains("class PostController extends Controller"));
        assert!(code.contains("'user_id' => 'required|integer|exists:users,id',"));
        assert!(code.contains("'title' => 'sometimes|required|string|max:200',"));
        assert!(code.contains("$post = Post::create($validated);"));
        assert!(code.contains("return response()->json($post, 201);"));
        assert!(code.contains("return response()->json(null, 204);"));
    }

    #[test]
    fn test_controller_unique_rule() {
        let schema = create_test_schema();
        let meta = metadata(&schema, "users");
        let code = ControllerGenerator::new(templates())
            .generate(&meta, &GenerationOptions::default())
            .unwrap()
            .content;
        assert!(code.contains("'email' => 'required|string|max:255|unique:users,email',"));
        assert!(code.contains("'email' => 'sometimes|required|string|max:255',"));
    }

    #[test]
    fn test_resource_hides_sensitive_columns() {
        let schema = create_test_schema();
        let meta = metadata(&schema, "users");
        let code = ResourceGenerator::new(templates())
            .generate(&meta, &GenerationOptions::default())
            .unwrap()
            .content;

        assert!(code.contains("class UserResource extends JsonResource"));
        assert!(code.contains("'email' => $this->email,"));
        assert!(!code.contains("$this->password"));
        assert!(!code.contains("$this->api_key"));
    }

    #[test]
    fn test_observer_events() {
        let schema = create_test_schema();
        let meta = metadata(&schema, "posts");
        let code = ObserverGenerator::new(templates())
            .generate(&meta, &GenerationOptions::default())
            .unwrap()
            .content;

        assert!(code.contains("class PostObserver"));
        assert!(code.contains("public function created(Post $post): void"));
        assert!(code.contains("public function restored(Post $post): void"));
        assert!(code.contains("public function forceDeleted(Post $post): void"));
        assert!(code.contains("Handle the Post \"deleted\" event."));
    }

    #[test]
    fn test_policy_ownership() {
        let schema = create_test_schema();
        let posts = metadata(&schema, "posts");
        let code = PolicyGenerator::new(templates())
            .generate(&posts, &GenerationOptions::default())
            .unwrap()
            .content;
        assert!(code.contains("use App\\Models\\Post;"));
        assert!(code.contains("use App\\Models\\User;"));
        assert!(code.contains("public function update(User $user, Post $post): bool"));
        assert!(code.contains("return $user->id === $post->user_id;"));
        assert!(code.contains("public function viewAny(User $user): bool"));

        let users = metadata(&schema, "users");
        let code = PolicyGenerator::new(templates())
            .generate(&users, &GenerationOptions::default())
            .unwrap()
            .content;
        assert_eq!(code.matches("use App\\Models\\User;").count(), 1);
        assert!(code.contains("public function delete(User $user, User $model): bool"));
        assert!(!code.contains("user_id"));
    }

    #[test]
    fn test_template_override() {
        let mut generator = TemplateGenerator::with_builtin_templates().unwrap();
        generator
            .register_template("resource", "{{model}}:{{#each columns}}{{this}};{{/each}}")
            .unwrap();

        let schema = create_test_schema();
        let meta = metadata(&schema, "tags");
        let artifact = ResourceGenerator::new(Arc::new(generator))
            .generate(&meta, &GenerationOptions::default())
            .unwrap();
        assert_eq!(artifact.content, "Tag:slug;label;");
    }
}
