//! Fixed instruction templates for the analysis model.

/// System message for the hosted chat-completion variant.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "Ти - експерт з аналізу розмов. Твоє завдання - \
надавати структурований та детальний аналіз транскрибованих розмов, фокусуючись на \
проблемах, рішеннях та загальній атмосфері спілкування.";

/// Build the per-chunk user prompt. The labeled-section output format it
/// demands is what the response parser expects back.
pub fn build_analysis_prompt(transcript: &str) -> String {
    format!(
        "Проаналізуй наступну транскрипцію розмови та надай структурований аналіз.

Вимоги до аналізу:

1. ПРОБЛЕМИ:
   - Виділи конкретні проблеми, про які йдеться в розмові
   - Кожна проблема має бути чітко сформульована
   - Уникай загальних формулювань
   - Якщо проблема складна, розбий її на конкретні аспекти

2. РІШЕННЯ:
   - Для кожної виявленої проблеми вкажи конкретне рішення
   - Рішення мають бути практичними та здійсненними
   - Вказуй конкретні кроки або дії
   - Якщо рішення не було запропоновано в розмові, не вигадуй його

3. ТЕМПЕРАТУРА РОЗМОВИ (оцінка від 1 до 10):
   Критерії оцінки:
   - 1-3: Холодна, формальна, можливо конфліктна розмова
   - 4-6: Нейтральна, робоча розмова
   - 7-8: Тепла, дружня розмова
   - 9-10: Дуже тепла, емоційно позитивна розмова

   Враховуй:
   - Тон спілкування
   - Використання ввічливих слів
   - Емоційне забарвлення
   - Готовність до співпраці
   - Вирішення конфліктних моментів

4. КОРОТКИЙ ЗМІСТ:
   - Стисло опиши основну суть розмови (2-3 речення)
   - Вкажи ключові результати або домовленості
   - Підсумуй загальний результат розмови

Транскрипція розмови:
{transcript}

Надай аналіз у такому форматі:
ПРОБЛЕМИ:
1. [Проблема 1]
2. [Проблема 2]
...

РІШЕННЯ:
1. [Рішення 1]
2. [Рішення 2]
...

ТЕМПЕРАТУРА РОЗМОВИ: [Число]/10
[Обґрунтування оцінки]

КОРОТКИЙ ЗМІСТ:
[Текст]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_transcript() {
        let prompt = build_analysis_prompt("Добрий день, у мене проблема.");
        assert!(prompt.contains("Добрий день, у мене проблема."));
        assert!(prompt.contains("ТЕМПЕРАТУРА РОЗМОВИ"));
        assert!(prompt.contains("КОРОТКИЙ ЗМІСТ"));
    }
}
