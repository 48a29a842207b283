// api.rs
use poem::http::StatusCode;
use poem_openapi::{
    ApiResponse, Object, OpenApi,
    param::Path,
    payload::{Form, Json},
};
use serde::Deserialize;
use validator::Validate;

use crate::entities::{post, user};
use crate::store::{AuthoredPost, Store, StoreError, Verification};

const USERNAME_REQUIRED: &str = "Username is required";
const POST_FIELDS_REQUIRED: &str = "Title, content, and user_id are required";
const USER_NOT_FOUND: &str = "User not found";

#[derive(Object)]
struct Message {
    message: String,
}

fn message(text: impl Into<String>) -> Json<Message> {
    Json(Message {
        message: text.into(),
    })
}

// ---- request bodies ----

#[derive(Object, Validate)]
struct NewUser {
    #[validate(required, length(min = 1))]
    username: Option<String>,
    email: Option<String>,
}

#[derive(Object, Validate)]
struct NewPost {
    #[validate(required, length(min = 1))]
    title: Option<String>,
    #[validate(required, length(min = 1))]
    content: Option<String>,
    #[validate(required)]
    user_id: Option<i32>,
}

#[derive(Object, Deserialize, Validate)]
struct UserForm {
    #[validate(required, length(min = 1))]
    username: Option<String>,
    email: Option<String>,
}

/// Form fields arrive as text, `user_id` included.
#[derive(Object, Deserialize, Validate)]
struct PostForm {
    #[validate(required, length(min = 1))]
    title: Option<String>,
    #[validate(required, length(min = 1))]
    content: Option<String>,
    #[validate(required, length(min = 1))]
    user_id: Option<String>,
}

// ---- response bodies ----

#[derive(Object)]
struct UserBody {
    id: i32,
    username: String,
    email: Option<String>,
}

impl From<user::Model> for UserBody {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

#[derive(Object)]
struct PostBody {
    id: i32,
    title: String,
    content: String,
    user_id: i32,
    username: Option<String>,
}

impl From<AuthoredPost> for PostBody {
    fn from(AuthoredPost { post, username }: AuthoredPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            username,
        }
    }
}

#[derive(Object)]
struct UserPost {
    id: i32,
    title: String,
    content: String,
}

#[derive(Object)]
struct UserWithPosts {
    id: i32,
    username: String,
    email: Option<String>,
    posts: Vec<UserPost>,
}

#[derive(Object)]
struct OwnedPost {
    id: i32,
    title: String,
    content: String,
    user_id: i32,
}

impl From<post::Model> for OwnedPost {
    fn from(p: post::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            user_id: p.user_id,
        }
    }
}

#[derive(Object)]
struct UserPosts {
    user_id: i32,
    username: String,
    posts: Vec<OwnedPost>,
}

#[derive(Object)]
struct PostSummary {
    id: i32,
    title: String,
}

#[derive(Object)]
struct VerifiedUser {
    id: i32,
    username: String,
    email: Option<String>,
    posts: Vec<PostSummary>,
}

#[derive(Object)]
struct Author {
    id: i32,
    username: String,
}

#[derive(Object)]
struct VerifiedPost {
    id: i32,
    title: String,
    user_id: i32,
    author: Option<Author>,
}

#[derive(Object)]
struct VerifyReport {
    users_count: u64,
    posts_count: u64,
    /// Every post has an author that lists it among its posts.
    consistent: bool,
    users: Vec<VerifiedUser>,
    posts: Vec<VerifiedPost>,
}

impl From<Verification> for VerifyReport {
    fn from(report: Verification) -> Self {
        let consistent = report.is_consistent();
        let users = report
            .users
            .into_iter()
            .map(|(u, posts)| VerifiedUser {
                id: u.id,
                username: u.username,
                email: u.email,
                posts: posts
                    .into_iter()
                    .map(|p| PostSummary {
                        id: p.id,
                        title: p.title,
                    })
                    .collect(),
            })
            .collect();
        let posts = report
            .posts
            .into_iter()
            .map(|(p, author)| VerifiedPost {
                id: p.id,
                title: p.title,
                user_id: p.user_id,
                author: author.map(|u| Author {
                    id: u.id,
                    username: u.username,
                }),
            })
            .collect();
        Self {
            users_count: report.users_count,
            posts_count: report.posts_count,
            consistent,
            users,
            posts,
        }
    }
}

// ---- responses ----

#[derive(ApiResponse)]
#[oai(bad_request_handler = "create_user_bad_request")]
enum CreateUserResponse {
    #[oai(status = 201)]
    Created(Json<UserBody>),
    #[oai(status = 400)]
    BadRequest(Json<Message>),
    #[oai(status = 409)]
    Conflict(Json<Message>),
}

fn invalid_body(err: &poem::Error) -> Json<Message> {
    tracing::warn!(error = %err, "unreadable request body");
    message(format!("Invalid request body: {err}"))
}

fn create_user_bad_request(err: poem::Error) -> CreateUserResponse {
    CreateUserResponse::BadRequest(invalid_body(&err))
}

#[derive(ApiResponse)]
#[oai(bad_request_handler = "create_post_bad_request")]
enum CreatePostResponse {
    #[oai(status = 201)]
    Created(Json<PostBody>),
    #[oai(status = 400)]
    BadRequest(Json<Message>),
}

fn create_post_bad_request(err: poem::Error) -> CreatePostResponse {
    CreatePostResponse::BadRequest(invalid_body(&err))
}

#[derive(ApiResponse)]
enum GetUserResponse {
    #[oai(status = 200)]
    Ok(Json<UserWithPosts>),
    #[oai(status = 404)]
    NotFound(Json<Message>),
}

#[derive(ApiResponse)]
enum UserPostsResponse {
    #[oai(status = 200)]
    Ok(Json<UserPosts>),
    #[oai(status = 404)]
    NotFound(Json<Message>),
}

/// Outcome of the seed-form routes.
#[derive(ApiResponse)]
#[oai(bad_request_handler = "seed_bad_request")]
enum SeedResponse {
    #[oai(status = 302)]
    Redirect(#[oai(header = "Location")] String),
    #[oai(status = 400)]
    BadRequest(Json<Message>),
    #[oai(status = 409)]
    Conflict(Json<Message>),
}

fn seed_bad_request(err: poem::Error) -> SeedResponse {
    SeedResponse::BadRequest(invalid_body(&err))
}

fn internal(err: StoreError) -> poem::Error {
    tracing::error!(error = %err, "store failure");
    poem::Error::from_string(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}

// ---- routes ----

pub struct Api {
    store: Store,
}

impl Api {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[OpenApi]
impl Api {
    /// Welcome
    #[oai(path = "/", method = "get")]
    async fn index(&self) -> Json<Message> {
        message("Welcome to the blog API")
    }

    /// All users
    #[oai(path = "/users", method = "get")]
    async fn list_users(&self) -> poem::Result<Json<Vec<UserBody>>> {
        let users = self.store.list_users().await.map_err(internal)?;
        Ok(Json(users.into_iter().map(UserBody::from).collect()))
    }

    /// Create a user
    #[oai(path = "/users", method = "post")]
    async fn create_user(&self, Json(input): Json<NewUser>) -> poem::Result<CreateUserResponse> {
        if input.validate().is_err() {
            tracing::warn!("user rejected: missing username");
            return Ok(CreateUserResponse::BadRequest(message(USERNAME_REQUIRED)));
        }
        let username = input.username.unwrap_or_default();
        match self.store.create_user(&username, input.email.as_deref()).await {
            Ok(user) => Ok(CreateUserResponse::Created(Json(user.into()))),
            Err(StoreError::Validation(msg)) => Ok(CreateUserResponse::BadRequest(message(msg))),
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!(%username, "user rejected: already exists");
                Ok(CreateUserResponse::Conflict(message(msg)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// One user with their posts
    #[oai(path = "/users/:id", method = "get")]
    async fn get_user(&self, Path(id): Path<i32>) -> poem::Result<GetUserResponse> {
        match self.store.get_posts_for_user(id).await {
            Ok((u, posts)) => Ok(GetUserResponse::Ok(Json(UserWithPosts {
                id: u.id,
                username: u.username,
                email: u.email,
                posts: posts
                    .into_iter()
                    .map(|p| UserPost {
                        id: p.id,
                        title: p.title,
                        content: p.content,
                    })
                    .collect(),
            }))),
            Err(StoreError::UserNotFound(_)) => {
                Ok(GetUserResponse::NotFound(message(USER_NOT_FOUND)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// Posts written by one user
    #[oai(path = "/users/:id/posts", method = "get")]
    async fn user_posts(&self, Path(id): Path<i32>) -> poem::Result<UserPostsResponse> {
        match self.store.get_posts_for_user(id).await {
            Ok((u, posts)) => Ok(UserPostsResponse::Ok(Json(UserPosts {
                user_id: u.id,
                username: u.username,
                posts: posts.into_iter().map(OwnedPost::from).collect(),
            }))),
            Err(StoreError::UserNotFound(_)) => {
                Ok(UserPostsResponse::NotFound(message(USER_NOT_FOUND)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// All posts with their author's username
    #[oai(path = "/posts", method = "get")]
    async fn list_posts(&self) -> poem::Result<Json<Vec<PostBody>>> {
        let posts = self.store.list_posts().await.map_err(internal)?;
        Ok(Json(posts.into_iter().map(PostBody::from).collect()))
    }

    /// Create a post
    #[oai(path = "/posts", method = "post")]
    async fn create_post(&self, Json(input): Json<NewPost>) -> poem::Result<CreatePostResponse> {
        if input.validate().is_err() {
            tracing::warn!("post rejected: missing fields");
            return Ok(CreatePostResponse::BadRequest(message(POST_FIELDS_REQUIRED)));
        }
        let NewPost {
            title,
            content,
            user_id,
        } = input;
        let (title, content, user_id) = (
            title.unwrap_or_default(),
            content.unwrap_or_default(),
            user_id.unwrap_or_default(),
        );
        match self.store.create_post(&title, &content, user_id).await {
            Ok(post) => Ok(CreatePostResponse::Created(Json(post.into()))),
            Err(StoreError::Validation(msg)) => Ok(CreatePostResponse::BadRequest(message(msg))),
            Err(StoreError::UserNotFound(_)) => {
                tracing::warn!(user_id, "post rejected: unknown user");
                Ok(CreatePostResponse::BadRequest(message(USER_NOT_FOUND)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// Seed a user from an HTML form
    #[oai(path = "/adduser", method = "post")]
    async fn add_user_form(&self, Form(input): Form<UserForm>) -> poem::Result<SeedResponse> {
        if input.validate().is_err() {
            return Ok(SeedResponse::BadRequest(message(USERNAME_REQUIRED)));
        }
        let username = input.username.unwrap_or_default();
        match self.store.create_user(&username, input.email.as_deref()).await {
            Ok(_) => Ok(SeedResponse::Redirect("/users".to_owned())),
            Err(StoreError::Validation(msg)) => Ok(SeedResponse::BadRequest(message(msg))),
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!(%username, "user rejected: already exists");
                Ok(SeedResponse::Conflict(message(msg)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// Seed a post from an HTML form
    #[oai(path = "/addposst", method = "post")]
    async fn add_post_form(&self, Form(input): Form<PostForm>) -> poem::Result<SeedResponse> {
        if input.validate().is_err() {
            return Ok(SeedResponse::BadRequest(message(POST_FIELDS_REQUIRED)));
        }
        let parsed = input.user_id.as_deref().and_then(|v| v.trim().parse::<i32>().ok());
        let Some(user_id) = parsed else {
            return Ok(SeedResponse::BadRequest(message("user_id must be an integer")));
        };
        let title = input.title.unwrap_or_default();
        let content = input.content.unwrap_or_default();
        match self.store.create_post(&title, &content, user_id).await {
            Ok(_) => Ok(SeedResponse::Redirect("/users".to_owned())),
            Err(StoreError::Validation(msg)) => Ok(SeedResponse::BadRequest(message(msg))),
            Err(StoreError::UserNotFound(_)) => {
                tracing::warn!(user_id, "post rejected: unknown user");
                Ok(SeedResponse::BadRequest(message(USER_NOT_FOUND)))
            }
            Err(err) => Err(internal(err)),
        }
    }

    /// Cross-check both sides of the user/post relation
    #[oai(path = "/verify", method = "get")]
    async fn verify(&self) -> poem::Result<Json<VerifyReport>> {
        let report = self.store.verify().await.map_err(internal)?;
        Ok(Json(report.into()))
    }
}
