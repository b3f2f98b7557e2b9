use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::models::{EnrollmentModel, StudentFields, StudentModel};
use crate::shared::{next_id, AppError};

/// Trait for student repository operations
#[async_trait]
pub trait StudentRepository {
    async fn list_students(&self) -> Result<Vec<StudentModel>, AppError>;
    async fn get_student(&self, id: i32) -> Result<Option<StudentModel>, AppError>;
    async fn create_student(&self, fields: &StudentFields)
        -> Result<Option<StudentModel>, AppError>;
    async fn update_student(&self, id: i32, fields: &StudentFields) -> Result<(), AppError>;
    async fn delete_student(&self, id: i32) -> Result<(), AppError>;
    async fn list_birthdays(&self, from: NaiveDate, days: u32)
        -> Result<Vec<StudentModel>, AppError>;
    async fn enroll_student(
        &self,
        student_id: i32,
        class_id: i32,
    ) -> Result<EnrollmentModel, AppError>;
    async fn list_enrollments(&self, student_id: i32) -> Result<Vec<EnrollmentModel>, AppError>;
}

#[derive(Default)]
struct InMemoryState {
    students: BTreeMap<i32, StudentModel>,
    enrollments: Vec<EnrollmentModel>,
    last_student_id: i32,
    last_enrollment_id: i32,
}

/// In-memory implementation of StudentRepository for development and testing
///
/// Mirrors the relational behavior the service relies on: sequential ids,
/// managed timestamps, and enrollments removed together with their student.
/// Data is lost when the application restarts.
#[derive(Default)]
pub struct InMemoryStudentRepository {
    state: Mutex<InMemoryState>,
}

impl InMemoryStudentRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory repository with pre-populated students
    pub fn with_students(students: Vec<StudentModel>) -> Self {
        let mut state = InMemoryState::default();
        for student in students {
            state.last_student_id = state.last_student_id.max(student.id);
            state.students.insert(student.id, student);
        }

        Self {
            state: Mutex::new(state),
        }
    }

    /// Returns the current number of students in the repository
    pub fn student_count(&self) -> usize {
        self.lock().map(|s| s.students.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, AppError> {
        self.state.lock().map_err(|_| {
            warn!("In-memory student store lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    #[instrument(skip(self))]
    async fn list_students(&self) -> Result<Vec<StudentModel>, AppError> {
        let state = self.lock()?;
        debug!(count = state.students.len(), "Listing students from memory");
        Ok(state.students.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn get_student(&self, id: i32) -> Result<Option<StudentModel>, AppError> {
        debug!(student_id = id, "Fetching student from memory");
        Ok(self.lock()?.students.get(&id).cloned())
    }

    #[instrument(skip(self, fields))]
    async fn create_student(
        &self,
        fields: &StudentFields,
    ) -> Result<Option<StudentModel>, AppError> {
        let mut state = self.lock()?;
        state.last_student_id = next_id(state.last_student_id, "imdaz_alunos_id_seq")?;
        let student = StudentModel::new(state.last_student_id, fields.clone());
        state.students.insert(student.id, student.clone());

        debug!(student_id = student.id, "Student created in memory");
        Ok(Some(student))
    }

    #[instrument(skip(self, fields))]
    async fn update_student(&self, id: i32, fields: &StudentFields) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let Some(student) = state.students.get_mut(&id) else {
            warn!(student_id = id, "Student not found for update in memory");
            return Err(AppError::NotFound("Student not found".to_string()));
        };
        student.apply(fields.clone());

        debug!(student_id = id, "Student updated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_student(&self, id: i32) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if state.students.remove(&id).is_none() {
            warn!(student_id = id, "Student not found for deletion in memory");
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        // ON DELETE CASCADE
        state.enrollments.retain(|e| e.aluno_id != id);

        debug!(student_id = id, "Student deleted from memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_birthdays(
        &self,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<StudentModel>, AppError> {
        let state = self.lock()?;
        let mut students = state
            .students
            .values()
            .filter(|s| s.has_birthday_within(from, days))
            .cloned()
            .collect::<Vec<_>>();
        students.sort_by_cached_key(|s| (s.days_until_birthday(from), s.nome.clone()));

        debug!(count = students.len(), "Birthdays listed from memory");
        Ok(students)
    }

    #[instrument(skip(self))]
    async fn enroll_student(
        &self,
        student_id: i32,
        class_id: i32,
    ) -> Result<EnrollmentModel, AppError> {
        let mut state = self.lock()?;
        if !state.students.contains_key(&student_id) {
            warn!(student_id, "Enrollment references unknown student");
            return Err(AppError::DatabaseError(
                "insert on table \"imdaz_alunos_turmas\" violates foreign key constraint"
                    .to_string(),
            ));
        }

        state.last_enrollment_id =
            next_id(state.last_enrollment_id, "imdaz_alunos_turmas_id_seq")?;
        let enrollment = EnrollmentModel::new(state.last_enrollment_id, student_id, class_id);
        state.enrollments.push(enrollment.clone());

        debug!(student_id, class_id, "Student enrolled in memory");
        Ok(enrollment)
    }

    #[instrument(skip(self))]
    async fn list_enrollments(&self, student_id: i32) -> Result<Vec<EnrollmentModel>, AppError> {
        Ok(self
            .lock()?
            .enrollments
            .iter()
            .filter(|e| e.aluno_id == student_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of student repository
pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_STUDENT: &str = "INSERT INTO imdaz_alunos (
    nome, cep, rua, bairro, cidade, numero, cpf, rg, emissao_rg, nascimento,
    genero_id, etnia_id, escola_id, tipo_residencia_id, tipo_parentesco_id,
    nome_responsavel, nome_mae, alfabetizado, nis, telefone, deficiencias,
    mae_trabalha_fora, mae_interesse_projetos, renda_familiar_mensal, quantidade_filhos,
    possui_irmao_instituicao, recebe_bolsa_familia, direito_imagem, possui_banheiro,
    possui_agua, possui_luz, nota_fiscal_gaucha
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
    $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32
) RETURNING *";

const UPDATE_STUDENT: &str = "UPDATE imdaz_alunos SET
    nome = $1, cep = $2, rua = $3, bairro = $4, cidade = $5, numero = $6, cpf = $7,
    rg = $8, emissao_rg = $9, nascimento = $10, genero_id = $11, etnia_id = $12,
    escola_id = $13, tipo_residencia_id = $14, tipo_parentesco_id = $15,
    nome_responsavel = $16, nome_mae = $17, alfabetizado = $18, nis = $19,
    telefone = $20, deficiencias = $21, mae_trabalha_fora = $22,
    mae_interesse_projetos = $23, renda_familiar_mensal = $24, quantidade_filhos = $25,
    possui_irmao_instituicao = $26, recebe_bolsa_familia = $27, direito_imagem = $28,
    possui_banheiro = $29, possui_agua = $30, possui_luz = $31, nota_fiscal_gaucha = $32,
    updated_at = NOW()
WHERE id = $33
RETURNING id";

// Matches month/day against each day of the window so the year end wraps
const SELECT_BIRTHDAYS: &str = "SELECT a.* FROM imdaz_alunos a
JOIN generate_series(0, $2 - 1) AS w(offs)
    ON to_char(a.nascimento, 'MM-DD') = to_char($1::date + w.offs, 'MM-DD')
ORDER BY w.offs, a.nome";

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>;

/// Binds the payload columns in the order used by INSERT_STUDENT and UPDATE_STUDENT
fn bind_fields<'q, O>(query: PgQueryAs<'q, O>, fields: &'q StudentFields) -> PgQueryAs<'q, O> {
    query
        .bind(&fields.nome)
        .bind(&fields.cep)
        .bind(&fields.rua)
        .bind(&fields.bairro)
        .bind(&fields.cidade)
        .bind(&fields.numero)
        .bind(&fields.cpf)
        .bind(&fields.rg)
        .bind(fields.emissao_rg)
        .bind(fields.nascimento)
        .bind(fields.genero_id)
        .bind(fields.etnia_id)
        .bind(fields.escola_id)
        .bind(fields.tipo_residencia_id)
        .bind(fields.tipo_parentesco_id)
        .bind(&fields.nome_responsavel)
        .bind(&fields.nome_mae)
        .bind(fields.alfabetizado)
        .bind(&fields.nis)
        .bind(&fields.telefone)
        .bind(&fields.deficiencias)
        .bind(fields.mae_trabalha_fora)
        .bind(fields.mae_interesse_projetos)
        .bind(fields.renda_familiar_mensal)
        .bind(fields.quantidade_filhos)
        .bind(fields.possui_irmao_instituicao)
        .bind(fields.recebe_bolsa_familia)
        .bind(fields.direito_imagem)
        .bind(fields.possui_banheiro)
        .bind(fields.possui_agua)
        .bind(fields.possui_luz)
        .bind(fields.nota_fiscal_gaucha)
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    #[instrument(skip(self))]
    async fn list_students(&self) -> Result<Vec<StudentModel>, AppError> {
        debug!("Listing students from database");

        let students =
            sqlx::query_as::<_, StudentModel>("SELECT * FROM imdaz_alunos ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to list students");
                    AppError::from(e)
                })?;

        debug!(count = students.len(), "Students listed from database");
        Ok(students)
    }

    #[instrument(skip(self))]
    async fn get_student(&self, id: i32) -> Result<Option<StudentModel>, AppError> {
        debug!(student_id = id, "Fetching student from database");

        sqlx::query_as::<_, StudentModel>("SELECT * FROM imdaz_alunos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, student_id = id, "Failed to fetch student");
                AppError::from(e)
            })
    }

    #[instrument(skip(self, fields))]
    async fn create_student(
        &self,
        fields: &StudentFields,
    ) -> Result<Option<StudentModel>, AppError> {
        debug!(nome = %fields.nome, "Creating student in database");

        let student = bind_fields(sqlx::query_as::<_, StudentModel>(INSERT_STUDENT), fields)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create student");
                AppError::from(e)
            })?;

        if let Some(s) = &student {
            debug!(student_id = s.id, "Student created in database");
        }
        Ok(student)
    }

    #[instrument(skip(self, fields))]
    async fn update_student(&self, id: i32, fields: &StudentFields) -> Result<(), AppError> {
        debug!(student_id = id, "Updating student in database");

        let updated = bind_fields(sqlx::query_as::<_, (i32,)>(UPDATE_STUDENT), fields)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, student_id = id, "Failed to update student");
                AppError::from(e)
            })?;

        if updated.is_none() {
            warn!(student_id = id, "Student not found for update");
            return Err(AppError::NotFound("Student not found".to_string()));
        }

        debug!(student_id = id, "Student updated in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_student(&self, id: i32) -> Result<(), AppError> {
        debug!(student_id = id, "Deleting student from database");

        let result = sqlx::query("DELETE FROM imdaz_alunos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, student_id = id, "Failed to delete student");
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            warn!(student_id = id, "Student not found for deletion");
            return Err(AppError::NotFound("Student not found".to_string()));
        }

        debug!(student_id = id, "Student deleted from database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_birthdays(
        &self,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<StudentModel>, AppError> {
        debug!(%from, days, "Listing birthdays from database");

        sqlx::query_as::<_, StudentModel>(SELECT_BIRTHDAYS)
            .bind(from)
            .bind(i32::try_from(days).unwrap_or(i32::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to list birthdays");
                AppError::from(e)
            })
    }

    #[instrument(skip(self))]
    async fn enroll_student(
        &self,
        student_id: i32,
        class_id: i32,
    ) -> Result<EnrollmentModel, AppError> {
        debug!(student_id, class_id, "Enrolling student in database");

        sqlx::query_as::<_, EnrollmentModel>(
            "INSERT INTO imdaz_alunos_turmas (aluno_id, turma_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, student_id, class_id, "Failed to enroll student");
            AppError::from(e)
        })
    }

    #[instrument(skip(self))]
    async fn list_enrollments(&self, student_id: i32) -> Result<Vec<EnrollmentModel>, AppError> {
        sqlx::query_as::<_, EnrollmentModel>(
            "SELECT * FROM imdaz_alunos_turmas WHERE aluno_id = $1 ORDER BY id",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, student_id, "Failed to list enrollments");
            AppError::from(e)
        })
    }
}
