use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    database::rollback,
    error::{AppError, AppResult},
    pagination::{CursorQuery, SortColumn},
    routes::{director::Director, genre::Genre, user::User},
    storage::AssetStorage,
};

use super::like::like_statuses;

/// 电影文件对外路径前缀，和 /public 静态目录对应
pub const MOVIE_ASSET_PREFIX: &str = "public/movie";

pub const DEFAULT_TAKE: i64 = 5;
pub const MAX_TAKE: i64 = 100;
pub const RECENT_LIMIT: i64 = 10;

/// 列表接口允许的排序列
pub const SORT_COLUMNS: &[SortColumn] = &[
    SortColumn {
        name: "id",
        sql: "m.id",
        cast: "",
    },
    SortColumn {
        name: "title",
        sql: "m.title",
        cast: "",
    },
    SortColumn {
        name: "likeCount",
        sql: "m.like_count",
        cast: "",
    },
    SortColumn {
        name: "dislikeCount",
        sql: "m.dislike_count",
        cast: "",
    },
    SortColumn {
        name: "createdAt",
        sql: "m.created_at",
        cast: "::timestamptz",
    },
    SortColumn {
        name: "updatedAt",
        sql: "m.updated_at",
        cast: "::timestamptz",
    },
];

const MOVIE_COLUMNS: &str = "m.id, m.title, m.detail_id, m.director_id, m.creator_id, \
     m.movie_file_path, m.like_count, m.dislike_count, m.created_at, m.updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub detail_id: i64,
    pub director_id: i64,
    pub creator_id: Option<i64>,
    pub movie_file_path: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 接口返回的电影，关联数据按需填充
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieView {
    pub id: i64,
    pub title: String,
    pub movie_file_path: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<Director>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    /// 外层 None 表示未登录，不输出；内层 None 输出为 null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_status: Option<Option<bool>>,
}

impl MovieView {
    pub fn new(movie: &Movie, asset_base_url: &str) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            movie_file_path: asset_url(asset_base_url, &movie.movie_file_path),
            like_count: movie.like_count,
            dislike_count: movie.dislike_count,
            created_at: movie.created_at,
            updated_at: movie.updated_at,
            detail: None,
            director: None,
            genres: Vec::new(),
            creator: None,
            like_status: None,
        }
    }
}

pub fn asset_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub title: String,
    pub detail: String,
    pub director_id: i64,
    pub genre_ids: Vec<i64>,
    pub movie_file_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub director_id: Option<i64>,
    pub genre_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieListQuery {
    pub title: Option<String>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub order: Vec<String>,
    pub take: Option<i64>,
}

impl MovieListQuery {
    pub fn take(&self) -> AppResult<i64> {
        match self.take {
            None => Ok(DEFAULT_TAKE),
            Some(n) if n < 1 => Err(AppError::BadRequest("take 必须大于 0".into())),
            Some(n) => Ok(n.min(MAX_TAKE)),
        }
    }

    /// 未指定排序时按 id 倒序
    pub fn order(&self) -> Vec<String> {
        if self.order.is_empty() {
            vec!["id_DESC".to_string()]
        } else {
            self.order.clone()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieList {
    pub data: Vec<MovieView>,
    pub next_cursor: Option<String>,
    pub count: i64,
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.chars().count() <= 2 {
        return Err(AppError::BadRequest("电影标题至少需要 3 个字符".into()));
    }
    Ok(())
}

fn validate_genre_ids(ids: &[i64]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("genreIds 不能为空".into()));
    }
    Ok(())
}

impl CreateMovieRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_title(&self.title)?;
        if self.detail.trim().is_empty() {
            return Err(AppError::BadRequest("detail 不能为空".into()));
        }
        validate_genre_ids(&self.genre_ids)?;
        if self.movie_file_name.trim().is_empty() {
            return Err(AppError::BadRequest("movieFileName 不能为空".into()));
        }
        Ok(())
    }
}

impl UpdateMovieRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(detail) = &self.detail {
            if detail.trim().is_empty() {
                return Err(AppError::BadRequest("detail 不能为空".into()));
            }
        }
        if let Some(ids) = &self.genre_ids {
            validate_genre_ids(ids)?;
        }
        Ok(())
    }
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// 事务内确认导演存在
async fn ensure_director(conn: &mut PgConnection, director_id: i64) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM director WHERE id = $1)")
        .bind(director_id)
        .fetch_one(&mut *conn)
        .await?;
    if !exists {
        return Err(AppError::NotFound("导演不存在".into()));
    }
    Ok(())
}

/// 事务内确认所有类型都存在，返回去重后的 ID
async fn ensure_genres(conn: &mut PgConnection, genre_ids: &[i64]) -> AppResult<Vec<i64>> {
    let requested = dedup_ids(genre_ids);
    let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM genre WHERE id = ANY($1) ORDER BY id")
        .bind(requested.as_slice())
        .fetch_all(&mut *conn)
        .await?;

    if found.len() != requested.len() {
        let existing: Vec<String> = found.iter().map(|id| id.to_string()).collect();
        return Err(AppError::NotFound(format!(
            "有不存在的类型，存在的 ids -> {}",
            existing.join(",")
        )));
    }
    Ok(requested)
}

async fn link_genres(conn: &mut PgConnection, movie_id: i64, genre_ids: &[i64]) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO movie_genres (movie_id, genre_id) SELECT $1, UNNEST($2::bigint[])",
    )
    .bind(movie_id)
    .bind(genre_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn push_title_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, title: Option<&str>) {
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        qb.push(" AND m.title LIKE ");
        qb.push_bind(format!("%{}%", title));
    }
}

impl Movie {
    /// 游标分页查询，返回当前页和满足条件的总数
    pub async fn find_page(
        pool: &PgPool,
        title: Option<&str>,
        cursor: &CursorQuery,
        take: i64,
    ) -> AppResult<(Vec<Self>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MOVIE_COLUMNS} FROM movie m WHERE TRUE"
        ));
        push_title_filter(&mut qb, title);
        cursor.push_condition(&mut qb);
        cursor.push_order_by(&mut qb);
        qb.push(" LIMIT ");
        qb.push_bind(take);

        tracing::debug!(sql = qb.sql(), "movie page query");
        let movies = qb.build_query_as::<Movie>().fetch_all(pool).await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movie m WHERE TRUE");
        push_title_filter(&mut count_qb, title);
        cursor.push_condition(&mut count_qb);
        let count: i64 = count_qb.build_query_scalar::<i64>().fetch_one(pool).await?;

        Ok((movies, count))
    }

    pub async fn find_recent(pool: &PgPool) -> AppResult<Vec<Self>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movie m ORDER BY m.created_at DESC LIMIT $1"
        ))
        .bind(RECENT_LIMIT)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Self>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movie m WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(movie)
    }

    /// 电影详情：简介、导演、类型、创建者
    pub async fn find_one(pool: &PgPool, id: i64, asset_base_url: &str) -> AppResult<MovieView> {
        let movie = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("电影不存在".into()))?;

        let detail: Option<String> =
            sqlx::query_scalar("SELECT detail FROM movie_detail WHERE id = $1")
                .bind(movie.detail_id)
                .fetch_optional(pool)
                .await?;

        let mut view = with_relations(pool, vec![movie.clone()], asset_base_url, None)
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("电影不存在".into()))?;
        view.detail = detail;

        if let Some(creator_id) = movie.creator_id {
            view.creator = User::find_by_id(pool, creator_id).await?;
        }

        Ok(view)
    }

    /// 在一个事务内写入简介、电影、类型关联，并把上传的文件移到电影目录
    pub async fn create(
        pool: &PgPool,
        storage: &AssetStorage,
        req: CreateMovieRequest,
        creator_id: i64,
    ) -> AppResult<i64> {
        req.validate()?;

        let mut tx = pool.begin().await?;
        let id = match Self::insert(&mut *tx, storage, &req, creator_id).await {
            Ok(id) => id,
            Err(e) => return Err(rollback(tx, e).await),
        };

        if let Err(e) = tx.commit().await {
            // 提交失败时文件放回临时目录
            if let Err(fs_err) = storage.demote(&req.movie_file_name).await {
                tracing::warn!(error = %fs_err, file = %req.movie_file_name, "failed to restore upload");
            }
            return Err(e.into());
        }

        tracing::info!(movie_id = id, creator_id, "movie created");
        Ok(id)
    }

    async fn insert(
        conn: &mut PgConnection,
        storage: &AssetStorage,
        req: &CreateMovieRequest,
        creator_id: i64,
    ) -> AppResult<i64> {
        ensure_director(conn, req.director_id).await?;
        let genre_ids = ensure_genres(conn, &req.genre_ids).await?;

        let detail_id: i64 =
            sqlx::query_scalar("INSERT INTO movie_detail (detail) VALUES ($1) RETURNING id")
                .bind(req.detail.as_str())
                .fetch_one(&mut *conn)
                .await?;

        let movie_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO movie (title, detail_id, director_id, creator_id, movie_file_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(req.title.as_str())
        .bind(detail_id)
        .bind(req.director_id)
        .bind(creator_id)
        .bind(format!("{}/{}", MOVIE_ASSET_PREFIX, req.movie_file_name))
        .fetch_one(&mut *conn)
        .await?;

        link_genres(conn, movie_id, &genre_ids).await?;

        // 最后移动文件，前面的写入失败时文件留在临时目录
        storage.promote(&req.movie_file_name).await?;

        Ok(movie_id)
    }

    pub async fn update(pool: &PgPool, id: i64, req: UpdateMovieRequest) -> AppResult<()> {
        req.validate()?;

        let mut tx = pool.begin().await?;
        if let Err(e) = Self::apply_update(&mut *tx, id, &req).await {
            return Err(rollback(tx, e).await);
        }
        tx.commit().await?;

        tracing::info!(movie_id = id, "movie updated");
        Ok(())
    }

    async fn apply_update(conn: &mut PgConnection, id: i64, req: &UpdateMovieRequest) -> AppResult<()> {
        let detail_id: i64 = sqlx::query_scalar("SELECT detail_id FROM movie WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("电影不存在".into()))?;

        if let Some(director_id) = req.director_id {
            ensure_director(conn, director_id).await?;
        }
        let genre_ids = match &req.genre_ids {
            Some(ids) => Some(ensure_genres(conn, ids).await?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE movie
            SET title = COALESCE($1, title),
                director_id = COALESCE($2, director_id),
                updated_at = NOW(),
                version = version + 1
            WHERE id = $3
            "#,
        )
        .bind(req.title.as_deref())
        .bind(req.director_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if let Some(detail) = &req.detail {
            sqlx::query("UPDATE movie_detail SET detail = $1 WHERE id = $2")
                .bind(detail.as_str())
                .bind(detail_id)
                .execute(&mut *conn)
                .await?;
        }

        if let Some(genre_ids) = genre_ids {
            sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            link_genres(conn, id, &genre_ids).await?;
        }

        Ok(())
    }

    /// 删除电影及其简介，返回被删除的 ID
    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        let mut tx = pool.begin().await?;
        if let Err(e) = Self::remove(&mut *tx, id).await {
            return Err(rollback(tx, e).await);
        }
        tx.commit().await?;

        tracing::info!(movie_id = id, "movie deleted");
        Ok(id)
    }

    async fn remove(conn: &mut PgConnection, id: i64) -> AppResult<()> {
        let detail_id: i64 = sqlx::query_scalar("DELETE FROM movie WHERE id = $1 RETURNING detail_id")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("电影不存在".into()))?;

        sqlx::query("DELETE FROM movie_detail WHERE id = $1")
            .bind(detail_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// 为一批电影补上导演、类型，以及给定用户的点赞状态
pub async fn with_relations(
    pool: &PgPool,
    movies: Vec<Movie>,
    asset_base_url: &str,
    user_id: Option<i64>,
) -> AppResult<Vec<MovieView>> {
    if movies.is_empty() {
        return Ok(Vec::new());
    }

    let movie_ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
    let director_ids = dedup_ids(&movies.iter().map(|m| m.director_id).collect::<Vec<_>>());

    let directors: HashMap<i64, Director> = Director::find_by_ids(pool, &director_ids)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
    for row in Genre::find_by_movies(pool, &movie_ids).await? {
        genres.entry(row.movie_id).or_default().push(row.into());
    }

    let likes = match user_id {
        Some(user_id) => Some(like_statuses(pool, user_id, &movie_ids).await?),
        None => None,
    };

    Ok(movies
        .iter()
        .map(|movie| {
            let mut view = MovieView::new(movie, asset_base_url);
            view.director = directors.get(&movie.director_id).cloned();
            view.genres = genres.remove(&movie.id).unwrap_or_default();
            view.like_status = likes.as_ref().map(|l| l.get(&movie.id).copied());
            view
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::next_cursor;

    fn movie(id: i64, like_count: i64) -> Movie {
        Movie {
            id,
            title: format!("movie-{}", id),
            detail_id: id,
            director_id: 1,
            creator_id: Some(1),
            movie_file_path: format!("{}/{}.mp4", MOVIE_ASSET_PREFIX, id),
            like_count,
            dislike_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn file_path_gets_asset_base_url() {
        let view = MovieView::new(&movie(1, 0), "http://localhost:3000/");
        assert_eq!(view.movie_file_path, "http://localhost:3000/public/movie/1.mp4");
    }

    #[test]
    fn like_status_only_rendered_for_known_users() {
        let mut view = MovieView::new(&movie(1, 0), "http://cdn");
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("likeStatus").is_none());
        assert!(json.get("version").is_none());

        view.like_status = Some(None);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["likeStatus"].is_null());

        view.like_status = Some(Some(true));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["likeStatus"], true);
    }

    #[test]
    fn cursor_uses_rendered_column_names() {
        let rows = vec![
            MovieView::new(&movie(30, 9), "http://cdn"),
            MovieView::new(&movie(27, 5), "http://cdn"),
        ];
        let cursor = CursorQuery::new(
            SORT_COLUMNS,
            &["likeCount_DESC".to_string(), "id_DESC".to_string()],
            None,
        )
        .unwrap();

        let token = next_cursor(&rows, &cursor.order()).unwrap().unwrap();
        let next = CursorQuery::new(SORT_COLUMNS, &[], Some(&token)).unwrap();
        assert!(next.has_cursor());
        assert_eq!(next.comparison_operator(), Some("<"));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM movie m WHERE TRUE");
        next.push_condition(&mut qb);
        assert!(qb.sql().ends_with("AND (m.like_count, m.id) < ($1, $2)"));
    }

    #[test]
    fn take_defaults_and_bounds() {
        let query = MovieListQuery::default();
        assert_eq!(query.take().unwrap(), DEFAULT_TAKE);
        assert_eq!(query.order(), vec!["id_DESC".to_string()]);

        let query = MovieListQuery {
            take: Some(1000),
            ..Default::default()
        };
        assert_eq!(query.take().unwrap(), MAX_TAKE);

        let query = MovieListQuery {
            take: Some(0),
            ..Default::default()
        };
        assert!(query.take().is_err());
    }

    #[test]
    fn create_request_validation() {
        let mut req = CreateMovieRequest {
            title: "Up".into(),
            detail: "house with balloons".into(),
            director_id: 1,
            genre_ids: vec![1],
            movie_file_name: "a_1.mp4".into(),
        };
        assert!(req.validate().is_err());

        req.title = "Heat".into();
        assert!(req.validate().is_ok());

        req.genre_ids.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_allows_partial_fields() {
        assert!(UpdateMovieRequest::default().validate().is_ok());
        let req = UpdateMovieRequest {
            title: Some("ab".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn duplicate_genre_ids_collapse() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }
}
